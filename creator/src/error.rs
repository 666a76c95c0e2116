//! Error types for report creation.
//!
//! Only [`CreateError::WriteXml`] is fatal for
//! [`ReportCreator::create_report`](crate::ReportCreator::create_report);
//! the other variants surface from the side-artifact helpers and the
//! configuration loader, and are logged by the creator.

use std::path::PathBuf;

use thiserror::Error;
use xts_report_core::ErrorId;

/// Errors that can occur while writing a report and its side artifacts.
#[derive(Debug, Error)]
pub enum CreateError {
    /// The primary `test_result.xml` could not be written.
    #[error("failed to write report XML {}: {source}", path.display())]
    WriteXml {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Zip archive failure.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Checksum manifest that cannot be used (e.g. written by a newer version).
    #[error("invalid checksum manifest: {0}")]
    InvalidChecksum(String),

    /// HTML rendering failure.
    #[error("HTML rendering failed: {0}")]
    Html(String),

    /// Configuration values that cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CreateError {
    /// Stable identifier of the error category.
    pub fn error_id(&self) -> ErrorId {
        match self {
            CreateError::WriteXml { .. } => ErrorId::ReportCreatorWriteXml,
            CreateError::InvalidConfig(_) | CreateError::Yaml(_) => ErrorId::ConfigInvalid,
            CreateError::Io(_)
            | CreateError::Json(_)
            | CreateError::Zip(_)
            | CreateError::InvalidChecksum(_)
            | CreateError::Html(_) => ErrorId::ReportCreatorArtifact,
        }
    }
}

/// Convenience alias for results with [`CreateError`].
pub type Result<T> = std::result::Result<T, CreateError>;
