//! Writes a merged report and its side artifacts into a result directory.
//!
//! Only the XML write is fatal. Every side artifact is best effort: a
//! failure is logged and the remaining steps still run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use xts_report_core::Report;

use crate::archive::zip_directory;
use crate::checksum::ReportChecksum;
use crate::config::OutputConfig;
use crate::error::{CreateError, Result};
use crate::html::{DefaultHtmlRenderer, HtmlRenderer, TEST_RESULT_HTML_FILE_NAME};
use crate::xml_writer::{TEST_RESULT_FILE_NAME, write_report_xml};

/// Static files copied next to `test_result.xml` for browser viewing.
pub const RESOURCE_FILES: [&str; 3] = [
    "compatibility_result.css",
    "compatibility_result.xsl",
    "logo.png",
];

/// Relative path of the serialized test record.
pub const TEST_RECORD_PATH: &str = "proto/test-record.pb";

/// Paths of the files a [`ReportCreator::create_report`] call produced.
///
/// Side artifacts that were disabled or failed are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedReport {
    pub xml: PathBuf,
    pub checksum: Option<PathBuf>,
    pub test_record: Option<PathBuf>,
    pub zip: Option<PathBuf>,
    pub html: Option<PathBuf>,
}

/// Serializes reports into result directories.
pub struct ReportCreator {
    config: OutputConfig,
    html_renderer: Box<dyn HtmlRenderer>,
}

impl std::fmt::Debug for ReportCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportCreator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReportCreator {
    pub fn new(config: OutputConfig) -> Self {
        Self {
            config,
            html_renderer: Box::new(DefaultHtmlRenderer::new()),
        }
    }

    pub fn with_html_renderer(mut self, renderer: Box<dyn HtmlRenderer>) -> Self {
        self.html_renderer = renderer;
        self
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Writes `report` into `result_dir` and produces the side artifacts.
    ///
    /// Steps, in order: `test_result.xml`, resource files, checksum manifest
    /// (only for a non-empty build fingerprint), `proto/test-record.pb`
    /// (only when `test_record` is given), sibling `<dir>.zip`, and
    /// `test_result.html`.
    ///
    /// # Errors
    ///
    /// Returns [`CreateError::WriteXml`] when the directory or the XML file
    /// cannot be written. Nothing else is reported as an error.
    pub fn create_report(
        &self,
        report: &Report,
        result_dir: &Path,
        test_record: Option<&[u8]>,
    ) -> Result<CreatedReport> {
        let xml = result_dir.join(TEST_RESULT_FILE_NAME);
        fs::create_dir_all(result_dir)
            .and_then(|()| write_report_xml(report, &xml))
            .map_err(|source| CreateError::WriteXml {
                path: xml.clone(),
                source,
            })?;
        info!(path = %xml.display(), modules = report.modules.len(), "wrote report XML");

        self.copy_resources(result_dir);

        let checksum = if report.build_fingerprint().is_empty() {
            warn!("build fingerprint is empty, skipping checksum manifest");
            None
        } else {
            match ReportChecksum::write(report, result_dir) {
                Ok(path) => Some(path),
                Err(err) => {
                    warn!(error = %err, "failed to write checksum manifest");
                    None
                }
            }
        };

        let test_record = match test_record {
            Some(bytes) => write_test_record(result_dir, bytes),
            None => {
                info!("no test record supplied, skipping {TEST_RECORD_PATH}");
                None
            }
        };

        let zip = if self.config.create_zip {
            self.zip(result_dir)
        } else {
            None
        };

        let html = if self.config.create_html {
            self.render_html(&xml, result_dir)
        } else {
            None
        };

        Ok(CreatedReport {
            xml,
            checksum,
            test_record,
            zip,
            html,
        })
    }

    fn copy_resources(&self, result_dir: &Path) {
        let Some(resource_dir) = &self.config.resource_dir else {
            info!("no resource directory configured, skipping report resources");
            return;
        };
        for name in RESOURCE_FILES {
            let source = resource_dir.join(name);
            if let Err(err) = fs::copy(&source, result_dir.join(name)) {
                warn!(path = %source.display(), error = %err, "failed to copy report resource");
            }
        }
    }

    fn zip(&self, result_dir: &Path) -> Option<PathBuf> {
        let Some(name) = result_dir.file_name() else {
            warn!(dir = %result_dir.display(), "result directory has no name, skipping zip");
            return None;
        };
        let mut zip_name = name.to_os_string();
        zip_name.push(".zip");
        let zip_path = result_dir.with_file_name(zip_name);
        match zip_directory(result_dir, &zip_path) {
            Ok(()) => {
                info!(path = %zip_path.display(), "created result archive");
                Some(zip_path)
            }
            Err(err) => {
                warn!(dir = %result_dir.display(), error = %err, "failed to zip result directory");
                None
            }
        }
    }

    fn render_html(&self, xml: &Path, result_dir: &Path) -> Option<PathBuf> {
        let html = result_dir.join(TEST_RESULT_HTML_FILE_NAME);
        match self.html_renderer.render(xml, &html) {
            Ok(()) => Some(html),
            Err(err) => {
                error!(error = %err, "failed to render HTML report");
                match fs::remove_file(&html) {
                    Ok(()) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => {
                        warn!(path = %html.display(), error = %err, "failed to remove partial HTML");
                    }
                }
                None
            }
        }
    }
}

fn write_test_record(result_dir: &Path, bytes: &[u8]) -> Option<PathBuf> {
    let path = result_dir.join(TEST_RECORD_PATH);
    let written = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::write(&path, bytes));
    match written {
        Ok(()) => Some(path),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to write test record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use xts_report_core::{BuildInfo, Module};

    use super::*;

    fn report(fingerprint: &str) -> Report {
        Report {
            build: Some(BuildInfo::new(fingerprint)),
            modules: vec![Module::new("CtsFoo", "x86").with_done(true)],
            ..Report::default()
        }
    }

    fn quiet_config() -> OutputConfig {
        OutputConfig {
            resource_dir: None,
            create_zip: false,
            create_html: false,
        }
    }

    struct FailingRenderer {
        calls: Arc<AtomicUsize>,
    }

    impl HtmlRenderer for FailingRenderer {
        fn render(&self, _xml_path: &Path, html_path: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(html_path, "<html><body>half")?;
            Err(CreateError::Html("stylesheet exploded".to_string()))
        }
    }

    #[test]
    fn test_writes_xml_and_checksum() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("results");
        let created = ReportCreator::new(quiet_config())
            .create_report(&report("fp"), &dir, None)
            .unwrap();

        assert_eq!(created.xml, dir.join(TEST_RESULT_FILE_NAME));
        assert!(created.xml.is_file());
        assert!(created.checksum.unwrap().is_file());
        assert!(created.test_record.is_none());
        assert!(created.zip.is_none());
        assert!(created.html.is_none());
    }

    #[test]
    fn test_empty_fingerprint_skips_checksum() {
        let root = tempfile::tempdir().unwrap();
        let created = ReportCreator::new(quiet_config())
            .create_report(&report(""), root.path(), None)
            .unwrap();
        assert!(created.checksum.is_none());
        assert!(!root.path().join(crate::checksum::CHECKSUM_FILE_NAME).exists());
    }

    #[test]
    fn test_writes_test_record() {
        let root = tempfile::tempdir().unwrap();
        let created = ReportCreator::new(quiet_config())
            .create_report(&report("fp"), root.path(), Some(&[8u8, 1, 16, 2][..]))
            .unwrap();
        let path = created.test_record.unwrap();
        assert_eq!(path, root.path().join(TEST_RECORD_PATH));
        assert_eq!(fs::read(path).unwrap(), vec![8, 1, 16, 2]);
    }

    #[test]
    fn test_failed_html_is_removed_and_not_fatal() {
        let root = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let config = OutputConfig {
            create_html: true,
            ..quiet_config()
        };
        let creator = ReportCreator::new(config).with_html_renderer(Box::new(FailingRenderer {
            calls: Arc::clone(&calls),
        }));

        let created = creator.create_report(&report("fp"), root.path(), None).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(created.html.is_none());
        assert!(!root.path().join(TEST_RESULT_HTML_FILE_NAME).exists());
    }

    #[test]
    fn test_missing_resources_are_not_fatal() {
        let root = tempfile::tempdir().unwrap();
        let resources = root.path().join("resources");
        fs::create_dir_all(&resources).unwrap();
        fs::write(resources.join("compatibility_result.css"), "body {}").unwrap();
        let config = OutputConfig {
            resource_dir: Some(resources),
            ..quiet_config()
        };

        let dir = root.path().join("results");
        ReportCreator::new(config)
            .create_report(&report("fp"), &dir, None)
            .unwrap();
        assert!(dir.join("compatibility_result.css").is_file());
        assert!(!dir.join("logo.png").exists());
    }

    #[test]
    fn test_no_resource_dir_skips_resources() {
        let root = tempfile::tempdir().unwrap();
        let creator = ReportCreator::new(quiet_config());
        assert!(creator.config().resource_dir.is_none());

        let created = creator.create_report(&report("fp"), root.path(), None).unwrap();
        assert!(created.xml.is_file());
        for name in RESOURCE_FILES {
            assert!(!root.path().join(name).exists());
        }
    }

    #[test]
    fn test_unwritable_result_dir_is_write_xml_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let err = ReportCreator::new(quiet_config())
            .create_report(&report("fp"), &blocker.join("results"), None)
            .unwrap_err();
        assert!(matches!(err, CreateError::WriteXml { .. }));
        assert_eq!(err.error_id(), xts_report_core::ErrorId::ReportCreatorWriteXml);
    }
}
