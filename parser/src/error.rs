//! Error types for report parsing.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use xts_report_core::ErrorId;

/// Errors that can occur while parsing report files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A report file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed XML report.
    #[error("malformed XML report {}: {message}", path.display())]
    Xml { path: PathBuf, message: String },

    /// Malformed Mobly YAML summary.
    #[error("malformed YAML summary {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Well-formed input carrying values the report model cannot hold.
    #[error("invalid report {}: {message}", path.display())]
    InvalidReport { path: PathBuf, message: String },

    /// The batch did not finish before its deadline.
    #[error("timed out after {timeout:?} parsing {format} reports ({pending} of {total} unfinished)")]
    Timeout {
        format: &'static str,
        timeout: Duration,
        pending: usize,
        total: usize,
    },

    /// A parse task failed for a reason other than a parse error.
    #[error("failed to parse {format} reports: {message}")]
    Failed {
        format: &'static str,
        message: String,
    },

    /// Worker pool could not be created.
    #[error("failed to build parse thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ParseError {
    /// Stable identifier for the error category.
    pub fn error_id(&self) -> ErrorId {
        match self {
            Self::Io { .. } | Self::Xml { .. } | Self::Yaml { .. } | Self::InvalidReport { .. } => {
                ErrorId::ParseReportsInvalidInput
            }
            Self::Timeout { .. } => ErrorId::ParseReportsTimeout,
            Self::Failed { .. } | Self::ThreadPool(_) => ErrorId::ParseReportsGeneric,
        }
    }
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
