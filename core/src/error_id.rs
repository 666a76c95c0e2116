use serde::{Deserialize, Serialize};

/// Stable identifier for an error category.
///
/// Callers branch on the identifier instead of matching message text. The
/// `Display` output matches the serde representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorId {
    /// Parsing did not finish before the batch deadline.
    ParseReportsTimeout,
    /// A parse task failed for a non-domain reason (e.g. it panicked).
    ParseReportsGeneric,
    /// A report file exists but could not be read or decoded.
    ParseReportsInvalidInput,
    /// Two reports in one merge describe different device builds.
    MergeBuildMismatch,
    /// No usable report was supplied to a validating merge.
    MergeNoUsableReports,
    /// The canonical `test_result.xml` could not be written.
    ReportCreatorWriteXml,
    /// A side artifact (checksum manifest, archive, HTML page) failed.
    ReportCreatorArtifact,
    /// A configuration file could not be read or parsed.
    ConfigInvalid,
}

impl std::fmt::Display for ErrorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseReportsTimeout => write!(f, "parse_reports_timeout"),
            Self::ParseReportsGeneric => write!(f, "parse_reports_generic"),
            Self::ParseReportsInvalidInput => write!(f, "parse_reports_invalid_input"),
            Self::MergeBuildMismatch => write!(f, "merge_build_mismatch"),
            Self::MergeNoUsableReports => write!(f, "merge_no_usable_reports"),
            Self::ReportCreatorWriteXml => write!(f, "report_creator_write_xml"),
            Self::ReportCreatorArtifact => write!(f, "report_creator_artifact"),
            Self::ConfigInvalid => write!(f, "config_invalid"),
        }
    }
}
