//! Report type definitions for compatibility test results.
//!
//! This module defines the canonical in-memory model of one test-suite run
//! for one device build. The same model is produced by every format adapter,
//! combined by the merge engine, and written back out by the report creator.
//!
//! Optional scalar fields are modeled as [`Option`] so that writers can
//! distinguish "never set" from "set to the default value" and omit the
//! former from the output.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;

/// Build attribute key that carries the device build fingerprint.
pub const BUILD_FINGERPRINT_ATTR: &str = "build_fingerprint";

/// One test-suite run for one device build.
///
/// A report is *usable* for identity and merge purposes only when it has a
/// [`BuildInfo`] with a non-empty fingerprint (see [`Report::is_usable`]).
///
/// # Examples
///
/// ```
/// use xts_report_core::{BuildInfo, Report};
///
/// let mut report = Report::default();
/// assert!(!report.is_usable());
///
/// report.build = Some(BuildInfo::new("google/bramble/bramble:14/UP1A/1:user/release-keys"));
/// assert!(report.is_usable());
/// assert_eq!(report.build_fingerprint(), "google/bramble/bramble:14/UP1A/1:user/release-keys");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Attributes of the `<Result>` element, in document order.
    #[serde(default)]
    pub attributes: Attributes,
    /// Device build identity and metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildInfo>,
    /// Previous runs folded into this report, if any were recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_history: Option<Vec<Run>>,
    /// Aggregate counts.
    #[serde(default)]
    pub summary: Summary,
    /// Per-module results, in document order.
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Report {
    /// Returns the build fingerprint, or `""` when the report has no build.
    pub fn build_fingerprint(&self) -> &str {
        self.build
            .as_ref()
            .map(|build| build.build_fingerprint.as_str())
            .unwrap_or("")
    }

    /// Returns `true` if the report can take part in a merge.
    pub fn is_usable(&self) -> bool {
        !self.build_fingerprint().is_empty()
    }

    /// Total number of tests across all modules and test cases.
    pub fn test_count(&self) -> usize {
        self.modules.iter().map(Module::test_count).sum()
    }
}

/// Device build identity plus arbitrary build metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Fingerprint uniquely identifying the device software build.
    pub build_fingerprint: String,
    /// Attributes of the `<Build>` element (keys are often `build_`-prefixed).
    #[serde(default)]
    pub attributes: Attributes,
}

impl BuildInfo {
    /// Creates build info with the given fingerprint and no attributes.
    pub fn new(build_fingerprint: impl Into<String>) -> Self {
        Self {
            build_fingerprint: build_fingerprint.into(),
            attributes: Attributes::new(),
        }
    }

    /// Adds a build attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(key, value);
        self
    }
}

/// Aggregate pass/fail and module completion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub passed: u64,
    pub failed: u64,
    pub modules_done: u32,
    pub modules_total: u32,
}

/// One entry of the `<RunHistory>` element.
///
/// Every field is optional; unset fields are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed_tests: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_tests: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_line_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
}

/// A named, ABI-scoped group of test cases.
///
/// # Examples
///
/// ```
/// use xts_report_core::{Module, Test, TestCase};
///
/// let module = Module::new("CtsBionicTestCases", "arm64-v8a")
///     .with_done(true)
///     .with_test_case(TestCase::new("unistd").with_test(Test::new("lockf", "pass")));
/// assert_eq!(module.merge_key(), "CtsBionicTestCases_arm64-v8a");
/// assert_eq!(module.test_count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tests: Option<u32>,
    /// Why the module did not complete, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    /// Set for modules that were not run by Tradefed (e.g. Mobly packages).
    #[serde(default)]
    pub is_non_tf_module: bool,
}

impl Module {
    /// Creates a module with a name and ABI and no other fields set.
    pub fn new(name: impl Into<String>, abi: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abi: Some(abi.into()),
            ..Self::default()
        }
    }

    pub fn with_done(mut self, done: bool) -> Self {
        self.done = Some(done);
        self
    }

    pub fn with_runtime_millis(mut self, runtime_millis: u64) -> Self {
        self.runtime_millis = Some(runtime_millis);
        self
    }

    pub fn with_counts(mut self, passed: u32, total_tests: u32) -> Self {
        self.passed = Some(passed);
        self.total_tests = Some(total_tests);
        self
    }

    pub fn with_reason(mut self, reason: Reason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn with_test_case(mut self, test_case: TestCase) -> Self {
        self.test_cases.push(test_case);
        self
    }

    /// Grouping key used when merging modules: `name + "_" + abi`.
    pub fn merge_key(&self) -> String {
        format!("{}_{}", self.name, self.abi.as_deref().unwrap_or(""))
    }

    /// Module identifier in the Tradefed form `"{abi} {name}"`.
    pub fn module_id(&self) -> String {
        format!("{} {}", self.abi.as_deref().unwrap_or(""), self.name)
    }

    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }

    pub fn test_count(&self) -> usize {
        self.test_cases.iter().map(|case| case.tests.len()).sum()
    }
}

/// Explanation attached to a module that did not complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub message: String,
    #[serde(default)]
    pub error_name: String,
    #[serde(default)]
    pub error_code: String,
}

impl Reason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// A named group of tests inside a module (usually one test class).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub tests: Vec<Test>,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
        }
    }

    pub fn with_test(mut self, test: Test) -> Self {
        self.tests.push(test);
        self
    }
}

/// A single test method result.
///
/// An empty `result` means the test was not executed; such tests are kept in
/// the model but never written out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    pub name: String,
    pub result: String,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<TestFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bug_report: Option<LoggedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logcat: Option<LoggedFile>,
    #[serde(default)]
    pub screenshots: Vec<LoggedFile>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl Test {
    pub fn new(name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: result.into(),
            ..Self::default()
        }
    }

    pub fn with_failure(mut self, failure: TestFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Returns `false` for tests that have no recorded result.
    pub fn was_executed(&self) -> bool {
        !self.result.is_empty()
    }
}

/// Failure details of a test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    pub message: String,
    #[serde(default)]
    pub error_name: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl TestFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }
}

/// A log attachment (bug report, logcat, screenshot).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedFile {
    pub file_name: String,
    pub content: String,
}

/// A key/content metric attached to a test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub content: String,
}

/// Outcome of parsing one raw report file.
///
/// Only lives between the parse orchestrator and the merge engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    /// File the report was parsed from, when there is one.
    pub source: Option<PathBuf>,
    /// `None` when the adapter produced no report for this input.
    pub report: Option<Report>,
}

impl ParseResult {
    pub fn new(source: Option<PathBuf>, report: Option<Report>) -> Self {
        Self { source, report }
    }

    /// Returns `true` if the parsed report is present and usable.
    pub fn is_usable(&self) -> bool {
        self.report.as_ref().is_some_and(Report::is_usable)
    }
}
