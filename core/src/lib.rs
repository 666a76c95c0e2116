//! Report model and merge engine for xTS compatibility test results.
//!
//! This crate defines the canonical in-memory representation of a test-suite
//! result and the algorithm that combines partial results into one:
//!
//! - [`Report`]: one test-suite run for one device build (result attributes,
//!   [`BuildInfo`], run history, [`Summary`], [`Module`]s).
//! - [`Module`] / [`TestCase`] / [`Test`]: the per-module result tree.
//! - [`Attributes`]: ordered attribute list with map-style helpers.
//! - [`ParseResult`]: a parsed report tagged with the file it came from.
//!
//! Merging ([`merge_reports`], [`merge_parsed_reports`]) folds reports of the
//! same build into one, refusing to combine different builds
//! ([`validate_build_fingerprints`]).
//!
//! Errors across the workspace carry a stable [`ErrorId`].
//!
//! # Example
//!
//! ```
//! use xts_report_core::*;
//!
//! let fingerprint = "google/bramble/bramble:14/UP1A/1:user/release-keys";
//! let shard = |start: &str, device: &str| {
//!     let mut report = Report {
//!         build: Some(BuildInfo::new(fingerprint)),
//!         summary: Summary { passed: 1, failed: 0, modules_done: 1, modules_total: 1 },
//!         ..Report::default()
//!     };
//!     report.attributes.push("start", start);
//!     report.attributes.push("devices", device);
//!     report.modules.push(
//!         Module::new("CtsBionicTestCases", "arm64-v8a")
//!             .with_done(true)
//!             .with_test_case(TestCase::new("unistd").with_test(Test::new("lockf", "pass"))),
//!     );
//!     report
//! };
//!
//! let merged = merge_reports(vec![shard("200", "A"), shard("100", "B")], true).unwrap();
//! assert_eq!(merged.attributes.get("start"), Some("100"));
//! assert_eq!(merged.attributes.get("devices"), Some("A,B"));
//! assert_eq!(merged.modules.len(), 1);
//! assert_eq!(merged.test_count(), 2);
//! ```

mod attributes;
mod error_id;
mod merge;
mod types;
mod validate;

pub use attributes::{Attribute, Attributes};
pub use error_id::ErrorId;
pub use merge::{
    COMMAND_LINE_ARGS_ATTR, DEVICES_ATTR, END_DISPLAY_TIME_ATTR, END_TIME_ATTR,
    START_DISPLAY_TIME_ATTR, START_TIME_ATTR, merge_parsed_reports, merge_reports,
};
pub use types::*;
pub use validate::{MergeValidationError, validate_build_fingerprints};
