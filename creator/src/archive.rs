//! Zip packaging of a result directory.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::checksum::sorted_entries;
use crate::error::Result;

/// Zips `dir` into `zip_path`.
///
/// Entries are added in sorted order and prefixed with the directory name,
/// so extracting the archive recreates `dir`. Paths inside the archive
/// always use `/`. A partially written archive is removed on failure.
pub fn zip_directory(dir: &Path, zip_path: &Path) -> Result<()> {
    let result = write_zip(dir, zip_path);
    if result.is_err() {
        let _ = fs::remove_file(zip_path);
    }
    result
}

fn write_zip(dir: &Path, zip_path: &Path) -> Result<()> {
    let file = File::create(zip_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let root = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut entries = 0;
    add_directory(&mut zip, dir, &root, options, &mut entries)?;

    let mut writer = zip.finish()?;
    writer.flush()?;
    debug!(dir = %dir.display(), zip = %zip_path.display(), entries, "zipped result directory");
    Ok(())
}

fn add_directory<W: Write + io::Seek>(
    zip: &mut ZipWriter<W>,
    dir: &Path,
    prefix: &str,
    options: SimpleFileOptions,
    entries: &mut usize,
) -> Result<()> {
    zip.add_directory(format!("{prefix}/"), options)?;
    for entry in sorted_entries(dir)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        let entry_name = format!("{prefix}/{name}");
        if path.is_dir() {
            add_directory(zip, &path, &entry_name, options, entries)?;
        } else {
            zip.start_file(entry_name, options)?;
            let mut source = File::open(&path)?;
            io::copy(&mut source, zip)?;
            *entries += 1;
        }
    }
    Ok(())
}
