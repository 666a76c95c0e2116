use std::path::PathBuf;

use xts_report_core::Report;

use crate::error::Result;

/// Converts one raw report input into the canonical [`Report`].
///
/// Adapters are shared across worker threads by the
/// [`ParseOrchestrator`](crate::ParseOrchestrator), so they must be
/// `Send + Sync`.
pub trait ReportAdapter: Send + Sync + 'static {
    /// What one parse call consumes (a path, a bundle of side files, ...).
    type Input: Send + 'static;

    /// Short format label used in logs and errors.
    fn format(&self) -> &'static str;

    /// File the report for `input` is read from, when there is one.
    fn source_path(&self, input: &Self::Input) -> Option<PathBuf>;

    /// Parses `input`.
    ///
    /// Returns `Ok(None)` when the input produces no report (for example a
    /// missing file) and `Err` only for unreadable or malformed input.
    fn parse(&self, input: &Self::Input) -> Result<Option<Report>>;
}
