//! Canonical serialization of merged xTS reports.
//!
//! [`ReportCreator`] writes a [`Report`](xts_report_core::Report) into a
//! result directory as `test_result.xml` and adds the side artifacts that
//! downstream tooling expects:
//!
//! - `compatibility_result.css`, `compatibility_result.xsl` and `logo.png`
//!   copied from the configured resource directory;
//! - `checksum-suite.json`, see [`ReportChecksum`];
//! - `proto/test-record.pb` when a test record payload is supplied;
//! - a sibling `<dir>.zip`, see [`zip_directory`];
//! - `test_result.html`, rendered by an [`HtmlRenderer`].
//!
//! Configuration is read from YAML through [`ReportConfig`].
//!
//! # Quick start
//!
//! ```
//! use xts_report_core::{BuildInfo, Report};
//! use xts_report_creator::{OutputConfig, ReportCreator};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let report = Report {
//!     build: Some(BuildInfo::new("google/bramble/bramble:14/UP1A/1:user/release-keys")),
//!     ..Report::default()
//! };
//!
//! let created = ReportCreator::new(OutputConfig::default())
//!     .create_report(&report, &dir.path().join("results"), None)
//!     .unwrap();
//! assert!(created.xml.is_file());
//! assert!(created.zip.is_some());
//! ```

mod archive;
mod checksum;
mod config;
mod creator;
mod error;
mod html;
mod xml_writer;

pub use archive::zip_directory;
pub use checksum::{
    CHECKSUM_FILE_NAME, ReportChecksum, module_result_signature, module_summary_signature,
    test_result_signature,
};
pub use config::{OutputConfig, ParseConfig, ReportConfig};
pub use creator::{CreatedReport, RESOURCE_FILES, ReportCreator, TEST_RECORD_PATH};
pub use error::{CreateError, Result};
pub use html::{DefaultHtmlRenderer, HtmlRenderer, TEST_RESULT_HTML_FILE_NAME};
pub use xml_writer::{
    TEST_RESULT_FILE_NAME, report_to_xml_string, sanitize_xml_content, write_report_xml,
};
