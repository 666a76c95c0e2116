//! Build identity validation for merge inputs.
//!
//! Reports can only be merged when they describe the same device build.
//! [`validate_build_fingerprints`] uses the fingerprint of the first report
//! as the baseline and returns one [`MergeValidationError`] per report that
//! disagrees with it.
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//! use xts_report_core::*;
//!
//! let a = Report { build: Some(BuildInfo::new("fp-a")), ..Report::default() };
//! let b = Report { build: Some(BuildInfo::new("fp-b")), ..Report::default() };
//!
//! assert!(validate_build_fingerprints(&[(None, &a), (None, &a)]).is_empty());
//!
//! let errors = validate_build_fingerprints(&[(None, &a), (Some(Path::new("b.xml")), &b)]);
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors[0].error_id(), ErrorId::MergeBuildMismatch);
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::{ErrorId, Report};

/// Merge input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeValidationError {
    /// No usable report was supplied.
    #[error("no usable report to merge")]
    NoUsableReports,
    /// A report's fingerprint differs from the first report's fingerprint.
    #[error("build fingerprint mismatch in {}: expected {expected}, found {found}", display_source(.path))]
    FingerprintMismatch {
        path: Option<PathBuf>,
        expected: String,
        found: String,
    },
}

impl MergeValidationError {
    pub fn error_id(&self) -> ErrorId {
        match self {
            Self::NoUsableReports => ErrorId::MergeNoUsableReports,
            Self::FingerprintMismatch { .. } => ErrorId::MergeBuildMismatch,
        }
    }
}

fn display_source(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Checks that every report shares the first report's build fingerprint.
///
/// Each mismatch is logged at `warn` and returned. An empty input yields
/// [`MergeValidationError::NoUsableReports`].
pub fn validate_build_fingerprints(
    reports: &[(Option<&Path>, &Report)],
) -> Vec<MergeValidationError> {
    let Some((_, first)) = reports.first() else {
        return vec![MergeValidationError::NoUsableReports];
    };
    let expected = first.build_fingerprint();

    let mut errors = Vec::new();
    for (source, report) in reports.iter().skip(1) {
        let found = report.build_fingerprint();
        if found == expected {
            continue;
        }
        warn!(
            source = %display_source(&source.map(Path::to_path_buf)),
            expected,
            found,
            "skipping merge: build fingerprint mismatch"
        );
        errors.push(MergeValidationError::FingerprintMismatch {
            path: source.map(Path::to_path_buf),
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuildInfo;

    fn report(fingerprint: &str) -> Report {
        Report {
            build: Some(BuildInfo::new(fingerprint)),
            ..Report::default()
        }
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert_eq!(
            validate_build_fingerprints(&[]),
            vec![MergeValidationError::NoUsableReports]
        );
    }

    #[test]
    fn test_reports_every_mismatch_against_first() {
        let a = report("A");
        let b = report("B");
        let c = report("C");
        let errors = validate_build_fingerprints(&[
            (None, &a),
            (Some(Path::new("/tmp/b.xml")), &b),
            (None, &a),
            (None, &c),
        ]);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0],
            MergeValidationError::FingerprintMismatch {
                path: Some(PathBuf::from("/tmp/b.xml")),
                expected: "A".to_string(),
                found: "B".to_string(),
            }
        );
        assert!(errors[1].to_string().contains("<unknown>"));
    }

    #[test]
    fn test_message_names_source_and_fingerprints() {
        let err = MergeValidationError::FingerprintMismatch {
            path: Some(PathBuf::from("x.xml")),
            expected: "A".to_string(),
            found: "B".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "build fingerprint mismatch in x.xml: expected A, found B"
        );
    }
}
