use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use xts_report_core::{ParseResult, Report, merge_parsed_reports};

use crate::error::Result;
use crate::mobly::{MoblyReportInfo, MoblyReportParser};
use crate::orchestrator::ParseOrchestrator;
use crate::xml::XmlReportParser;

/// Parses report batches and merges them into one report per build.
#[derive(Debug, Clone)]
pub struct ReportMerger {
    orchestrator: ParseOrchestrator,
    xml_parser: Arc<XmlReportParser>,
    mobly_parser: Arc<MoblyReportParser>,
}

impl ReportMerger {
    pub fn new(orchestrator: ParseOrchestrator) -> Self {
        Self::with_parsers(
            orchestrator,
            Arc::new(XmlReportParser::new()),
            Arc::new(MoblyReportParser::new()),
        )
    }

    pub fn with_parsers(
        orchestrator: ParseOrchestrator,
        xml_parser: Arc<XmlReportParser>,
        mobly_parser: Arc<MoblyReportParser>,
    ) -> Self {
        Self {
            orchestrator,
            xml_parser,
            mobly_parser,
        }
    }

    pub fn parse_xml_reports(&self, paths: Vec<PathBuf>) -> Result<Vec<ParseResult>> {
        self.orchestrator
            .parse_all(Arc::clone(&self.xml_parser), paths)
    }

    pub fn parse_mobly_reports(&self, infos: Vec<MoblyReportInfo>) -> Result<Vec<ParseResult>> {
        self.orchestrator
            .parse_all(Arc::clone(&self.mobly_parser), infos)
    }

    /// Parses and merges `test_result.xml` files.
    ///
    /// `Ok(None)` means nothing mergeable was found (no usable report, or
    /// reports from different builds).
    pub fn merge_xml_reports(&self, paths: Vec<PathBuf>) -> Result<Option<Report>> {
        let count = paths.len();
        let merged = merge_parsed_reports(self.parse_xml_reports(paths)?);
        info!(inputs = count, merged = merged.is_some(), "merged XML reports");
        Ok(merged)
    }

    /// Parses and merges Mobly result bundles.
    pub fn merge_mobly_reports(&self, infos: Vec<MoblyReportInfo>) -> Result<Option<Report>> {
        let count = infos.len();
        let merged = merge_parsed_reports(self.parse_mobly_reports(infos)?);
        info!(inputs = count, merged = merged.is_some(), "merged Mobly reports");
        Ok(merged)
    }
}
