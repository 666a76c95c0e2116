//! Format adapters and concurrent parsing for xTS test results.
//!
//! This crate turns raw result artifacts into the canonical
//! [`Report`](xts_report_core::Report) model:
//!
//! - [`XmlReportParser`]: reads `test_result.xml` files.
//! - [`MoblyReportParser`]: reads Mobly `test_summary.yaml` streams plus
//!   their text-format attribute side files.
//! - [`ParseOrchestrator`]: runs an adapter over a batch of inputs on a
//!   bounded rayon pool with one deadline for the whole batch.
//! - [`ReportMerger`]: parses a batch and merges it with
//!   [`merge_parsed_reports`](xts_report_core::merge_parsed_reports).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use xts_report_parser::{ParseOrchestrator, ReportMerger, build_thread_pool};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let write = |name: &str, fingerprint: &str, module: &str| {
//!     let path = dir.path().join(name);
//!     std::fs::write(
//!         &path,
//!         format!(
//!             r#"<Result><Build build_fingerprint="{fingerprint}"/>
//!                <Summary pass="1" failed="0" modules_done="1" modules_total="1"/>
//!                <Module name="{module}" abi="x86" done="true"/></Result>"#
//!         ),
//!     )
//!     .unwrap();
//!     path
//! };
//! let a = write("a.xml", "fp", "CtsFoo");
//! let b = write("b.xml", "fp", "CtsBar");
//!
//! let orchestrator = ParseOrchestrator::new(build_thread_pool(2).unwrap(), Duration::from_secs(30));
//! let merged = ReportMerger::new(orchestrator).merge_xml_reports(vec![a, b]).unwrap().unwrap();
//! assert_eq!(merged.summary.passed, 2);
//! assert_eq!(merged.summary.modules_total, 2);
//! ```

mod adapter;
pub mod constants;
mod error;
mod merger;
pub mod mobly;
mod orchestrator;
pub mod textproto;
mod xml;

pub use adapter::ReportAdapter;
pub use error::{ParseError, Result};
pub use merger::ReportMerger;
pub use mobly::{MoblyReportInfo, MoblyReportParser};
pub use orchestrator::{
    DEFAULT_PARSE_TIMEOUT, ParseOrchestrator, build_thread_pool, default_parallel_jobs,
};
pub use xml::XmlReportParser;
