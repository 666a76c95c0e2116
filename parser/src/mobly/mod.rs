//! Adapter for Mobly test results.
//!
//! A Mobly package run produces a `test_summary.yaml` stream plus two
//! optional text-format attribute files (result attributes and build
//! attributes). [`MoblyReportParser`] turns one such bundle, described by a
//! [`MoblyReportInfo`], into a single-module [`Report`].

mod yaml;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xts_report_core::{
    Attributes, BuildInfo, Module, Report, Summary, Test, TestCase, TestFailure,
};

pub use yaml::{
    MoblyDocEntry, MoblyResult, MoblySummaryEntry, MoblyTestEntry, MoblyYamlError,
    MoblyYamlParser,
};

use crate::adapter::ReportAdapter;
use crate::error::{ParseError, Result};
use crate::textproto::parse_attribute_list;

/// Location and identity of one Mobly package result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoblyReportInfo {
    /// Mobly package the summary file belongs to.
    pub package_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_abi: Option<String>,
    /// Module parameter, appended to the module name as `[param]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_parameter: Option<String>,
    pub summary_file: PathBuf,
    /// Text-format attribute list copied into the `<Result>` attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_attributes_file: Option<PathBuf>,
    /// Fingerprint of the primary device build the package ran against.
    pub device_build_fingerprint: String,
    /// Text-format attribute list copied into the `<Build>` attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_attributes_file: Option<PathBuf>,
}

impl MoblyReportInfo {
    pub fn new(
        package_name: impl Into<String>,
        summary_file: impl Into<PathBuf>,
        device_build_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            module_abi: None,
            module_parameter: None,
            summary_file: summary_file.into(),
            result_attributes_file: None,
            device_build_fingerprint: device_build_fingerprint.into(),
            build_attributes_file: None,
        }
    }

    /// Module name: the package name, plus `[parameter]` when one is set.
    pub fn module_name(&self) -> String {
        match self.module_parameter.as_deref() {
            Some(parameter) if !parameter.is_empty() => {
                format!("{}[{}]", self.package_name, parameter)
            }
            _ => self.package_name.clone(),
        }
    }
}

/// Parses Mobly result bundles into reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoblyReportParser {
    yaml: MoblyYamlParser,
}

impl MoblyReportParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a report from one Mobly result bundle.
    ///
    /// Returns `Ok(None)` when the summary file does not exist. Attribute
    /// files that are missing or malformed are logged and treated as empty.
    pub fn parse_info(&self, info: &MoblyReportInfo) -> Result<Option<Report>> {
        if !info.summary_file.is_file() {
            debug!(path = %info.summary_file.display(), "Mobly summary file not found");
            return Ok(None);
        }

        let result_attributes = read_attribute_file(info.result_attributes_file.as_deref(), "result");
        let build_attributes = read_attribute_file(info.build_attributes_file.as_deref(), "build");

        let yaml = std::fs::read_to_string(&info.summary_file).map_err(|source| ParseError::Io {
            path: info.summary_file.clone(),
            source,
        })?;
        let entries = self.yaml.parse_str(&yaml).map_err(|err| match err {
            MoblyYamlError::Yaml(source) => ParseError::Yaml {
                path: info.summary_file.clone(),
                source,
            },
            other => ParseError::InvalidReport {
                path: info.summary_file.clone(),
                message: other.to_string(),
            },
        })?;

        let mut module = Module {
            name: info.module_name(),
            abi: info.module_abi.clone(),
            is_non_tf_module: true,
            ..Module::default()
        };
        let mut runtime: u64 = 0;
        let mut tests: Vec<MoblyTestEntry> = Vec::new();
        let mut failed: u64 = 0;

        for entry in entries {
            match entry {
                MoblyDocEntry::Test(test) => {
                    runtime = runtime.saturating_add(test.runtime_millis());
                    tests.push(test);
                }
                MoblyDocEntry::Summary(summary) => {
                    module.done = Some(true);
                    module.total_tests = Some(summary.requested);
                    module.passed = Some(summary.passed);
                    failed = u64::from(summary.failed);
                }
                MoblyDocEntry::ControllerInfo(_) | MoblyDocEntry::UserData { .. } => {}
            }
        }
        module.runtime_millis = Some(runtime);
        module.test_cases = group_by_class(tests);

        let summary = Summary {
            passed: u64::from(module.passed.unwrap_or(0)),
            failed,
            modules_done: u32::from(module.is_done()),
            modules_total: 1,
        };

        Ok(Some(Report {
            attributes: result_attributes,
            build: Some(BuildInfo {
                build_fingerprint: info.device_build_fingerprint.clone(),
                attributes: build_attributes,
            }),
            run_history: None,
            summary,
            modules: vec![module],
        }))
    }
}

impl ReportAdapter for MoblyReportParser {
    type Input = MoblyReportInfo;

    fn format(&self) -> &'static str {
        "mobly"
    }

    fn source_path(&self, input: &MoblyReportInfo) -> Option<PathBuf> {
        Some(input.summary_file.clone())
    }

    fn parse(&self, input: &MoblyReportInfo) -> Result<Option<Report>> {
        self.parse_info(input)
    }
}

fn read_attribute_file(path: Option<&Path>, kind: &str) -> Attributes {
    let Some(path) = path.filter(|path| path.is_file()) else {
        return Attributes::new();
    };
    let parsed = std::fs::read_to_string(path)
        .map_err(|err| err.to_string())
        .and_then(|text| parse_attribute_list(&text).map_err(|err| err.to_string()));
    match parsed {
        Ok(attributes) => attributes,
        Err(err) => {
            warn!(path = %path.display(), kind, error = %err, "failed to parse attributes file");
            Attributes::new()
        }
    }
}

/// One test case per test class, in first-seen class order.
fn group_by_class(tests: Vec<MoblyTestEntry>) -> Vec<TestCase> {
    let mut cases: Vec<TestCase> = Vec::new();
    for entry in tests {
        let test = to_report_test(&entry);
        match cases.iter_mut().find(|case| case.name == entry.test_class) {
            Some(case) => case.tests.push(test),
            None => cases.push(TestCase::new(entry.test_class).with_test(test)),
        }
    }
    cases
}

fn to_report_test(entry: &MoblyTestEntry) -> Test {
    let mut test = Test::new(entry.test_name.clone(), entry.result.as_report_result());
    test.skipped = entry.result == MoblyResult::Skip;
    if matches!(entry.result, MoblyResult::Fail | MoblyResult::Error)
        && (entry.details.is_some() || entry.stacktrace.is_some())
    {
        test.failure = Some(TestFailure {
            message: entry.details.clone().unwrap_or_default(),
            stack_trace: entry.stacktrace.clone(),
            ..TestFailure::default()
        });
    }
    test
}
