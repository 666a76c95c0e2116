//! Checksum manifest for a result directory.
//!
//! `checksum-suite.json` records a SHA-256 digest of every test result
//! signature in the report and of every file in the result directory, so a
//! later consumer can tell whether results or files were altered.
//!
//! Signatures use the harness formats:
//!
//! ```text
//! {fingerprint}/{abi} {module}/{done}/{fail count}
//! {fingerprint}/{abi} {module}/{fail count}
//! {fingerprint}/{abi} {module}/{case}#{test}/{result}/{stack trace}/
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use xts_report_core::{Module, Report, Test};

use crate::error::{CreateError, Result};

/// File name of the manifest inside a result directory.
pub const CHECKSUM_FILE_NAME: &str = "checksum-suite.json";

const CURRENT_VERSION: u32 = 1;
const SEPARATOR: char = '/';

/// Digests of the results and files of one result directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportChecksum {
    pub version: u32,
    pub build_fingerprint: String,
    /// SHA-256 hex digests of the result signatures.
    pub result_signatures: BTreeSet<String>,
    /// SHA-256 hex digest per file, keyed by `{dir name}/{relative path}`.
    pub file_checksums: BTreeMap<String, String>,
}

impl ReportChecksum {
    /// Computes the manifest for `report` and the files currently in `dir`.
    ///
    /// An existing manifest file in `dir` is not included.
    pub fn compute(report: &Report, dir: &Path) -> Result<Self> {
        let build_fingerprint = report.build_fingerprint().to_string();
        let mut checksum = Self {
            version: CURRENT_VERSION,
            build_fingerprint,
            result_signatures: BTreeSet::new(),
            file_checksums: BTreeMap::new(),
        };
        for module in &report.modules {
            checksum.add_module(module);
        }

        let root = dir_name(dir);
        checksum.add_directory(dir, &root, true)?;
        debug!(
            dir = %dir.display(),
            results = checksum.result_signatures.len(),
            files = checksum.file_checksums.len(),
            "computed checksum manifest"
        );
        Ok(checksum)
    }

    /// Computes the manifest and writes it into `dir`.
    pub fn write(report: &Report, dir: &Path) -> Result<PathBuf> {
        let checksum = Self::compute(report, dir)?;
        let path = dir.join(CHECKSUM_FILE_NAME);
        checksum.save(&path)?;
        Ok(path)
    }

    /// Loads the manifest stored in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidChecksum`](CreateError::InvalidChecksum) when the
    /// manifest was written by a newer format version.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(dir.as_ref().join(CHECKSUM_FILE_NAME))?;
        let checksum: Self = serde_json::from_reader(BufReader::new(file))?;
        if checksum.version > CURRENT_VERSION {
            return Err(CreateError::InvalidChecksum(format!(
                "unsupported version {} (newest known is {CURRENT_VERSION})",
                checksum.version
            )));
        }
        Ok(checksum)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Returns `true` if the manifest holds the signature of `test`.
    pub fn contains_test_result(&self, test: &Test, module: &Module, case_name: &str) -> bool {
        let signature = test_result_signature(&self.build_fingerprint, module, case_name, test);
        self.result_signatures.contains(&sha256_hex(signature.as_bytes()))
    }

    /// Returns `true` if the module result and summary signatures are present.
    pub fn contains_module_result(&self, module: &Module) -> bool {
        let result = module_result_signature(&self.build_fingerprint, module);
        let summary = module_summary_signature(&self.build_fingerprint, module);
        self.result_signatures.contains(&sha256_hex(result.as_bytes()))
            && self.result_signatures.contains(&sha256_hex(summary.as_bytes()))
    }

    /// Returns `true` if `file` is recorded under `key` with its current content.
    pub fn contains_file(&self, key: &str, file: &Path) -> bool {
        let Some(expected) = self.file_checksums.get(key) else {
            return false;
        };
        match fs::read(file) {
            Ok(bytes) => *expected == sha256_hex(&bytes),
            Err(_) => false,
        }
    }

    fn add_module(&mut self, module: &Module) {
        let fingerprint = self.build_fingerprint.clone();
        self.add_signature(&module_result_signature(&fingerprint, module));
        self.add_signature(&module_summary_signature(&fingerprint, module));
        for case in &module.test_cases {
            for test in &case.tests {
                self.add_signature(&test_result_signature(&fingerprint, module, &case.name, test));
            }
        }
    }

    fn add_signature(&mut self, signature: &str) {
        self.result_signatures.insert(sha256_hex(signature.as_bytes()));
    }

    fn add_directory(&mut self, dir: &Path, key: &str, is_root: bool) -> Result<()> {
        for entry in sorted_entries(dir)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            if path.is_dir() {
                self.add_directory(&path, &format!("{key}{SEPARATOR}{name}"), false)?;
            } else if !(is_root && name == CHECKSUM_FILE_NAME) {
                let bytes = fs::read(&path)?;
                self.file_checksums
                    .insert(format!("{key}{SEPARATOR}{name}"), sha256_hex(&bytes));
            }
        }
        Ok(())
    }
}

/// `{fingerprint}/{abi} {module}/{done}/{fail count}`.
pub fn module_result_signature(fingerprint: &str, module: &Module) -> String {
    format!(
        "{fingerprint}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
        module.module_id(),
        module.is_done(),
        failed_test_count(module)
    )
}

/// `{fingerprint}/{abi} {module}/{fail count}`.
pub fn module_summary_signature(fingerprint: &str, module: &Module) -> String {
    format!(
        "{fingerprint}{SEPARATOR}{}{SEPARATOR}{}",
        module.module_id(),
        failed_test_count(module)
    )
}

/// `{fingerprint}/{abi} {module}/{case}#{test}/{result}/{stack trace}/`.
///
/// The stack trace is trimmed and stripped of line breaks.
pub fn test_result_signature(
    fingerprint: &str,
    module: &Module,
    case_name: &str,
    test: &Test,
) -> String {
    let stack_trace: String = test
        .failure
        .as_ref()
        .and_then(|failure| failure.stack_trace.as_deref())
        .unwrap_or("")
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r'))
        .collect();
    format!(
        "{fingerprint}{SEPARATOR}{}{SEPARATOR}{case_name}#{}{SEPARATOR}{}{SEPARATOR}{stack_trace}{SEPARATOR}",
        module.module_id(),
        test.name,
        test.result
    )
}

fn failed_test_count(module: &Module) -> usize {
    module
        .test_cases
        .iter()
        .flat_map(|case| &case.tests)
        .filter(|test| test.result == "fail")
        .count()
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn sorted_entries(dir: &Path) -> std::io::Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}
