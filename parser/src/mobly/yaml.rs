//! Reader for Mobly `test_summary.yaml` files.
//!
//! A summary file is a stream of YAML documents, each tagged with a `Type`.
//! [`MoblyYamlParser::parse_str`] turns the stream into [`MoblyDocEntry`]
//! values, applying Mobly's class-stage rules on the way:
//!
//! - an `ERROR` in `setup_class` or `pre_run` marks every following test of
//!   that class as errored;
//! - `teardown_class` and `clean_up` records are dropped.

use std::fmt;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{error, warn};

const TYPE_KEY: &str = "Type";
const TYPE_RECORD: &str = "Record";
const TYPE_SUMMARY: &str = "Summary";
const TYPE_CONTROLLER_INFO: &str = "ControllerInfo";
const TYPE_USER_DATA: &str = "UserData";
const TYPE_TEST_NAME_LIST: &str = "TestNameList";

const TEST_NAME: &str = "Test Name";
const TEST_CLASS: &str = "Test Class";
const RESULT: &str = "Result";
const BEGIN_TIME: &str = "Begin Time";
const END_TIME: &str = "End Time";
const DETAILS: &str = "Details";
const STACKTRACE: &str = "Stacktrace";
const UID: &str = "UID";
const SIGNATURE: &str = "Signature";
const USER_DATA_TIMESTAMP: &str = "timestamp";

const SUMMARY_REQUESTED: &str = "Requested";
const SUMMARY_EXECUTED: &str = "Executed";
const SUMMARY_PASSED: &str = "Passed";
const SUMMARY_FAILED: &str = "Failed";

const STAGE_SETUP_CLASS: &str = "setup_class";
const STAGE_PRE_RUN: &str = "pre_run";
const STAGE_TEARDOWN_CLASS: &str = "teardown_class";
const STAGE_CLEAN_UP: &str = "clean_up";

const INTERRUPTED_DETAILS: &str = "Test was interrupted manually.";

/// Outcome of one Mobly test record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoblyResult {
    Pass,
    Fail,
    Error,
    Skip,
    /// The run was interrupted before the test finished.
    Null,
}

impl MoblyResult {
    fn from_value(value: Option<&Value>) -> Option<Self> {
        match value {
            None | Some(Value::Null) => Some(Self::Null),
            Some(Value::String(result)) => match result.as_str() {
                "PASS" => Some(Self::Pass),
                "FAIL" => Some(Self::Fail),
                "ERROR" => Some(Self::Error),
                "SKIP" => Some(Self::Skip),
                "null" => Some(Self::Null),
                _ => None,
            },
            Some(_) => None,
        }
    }

    /// Result string used in `test_result.xml`.
    pub fn as_report_result(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
            Self::Skip => "skip",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for MoblyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_report_result())
    }
}

/// One test method record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoblyTestEntry {
    pub test_name: String,
    pub test_class: String,
    pub result: MoblyResult,
    pub begin_time: Option<i64>,
    pub end_time: Option<i64>,
    pub details: Option<String>,
    pub stacktrace: Option<String>,
    pub uid: Option<String>,
    pub signature: Option<String>,
}

impl MoblyTestEntry {
    /// Wall time of the test in milliseconds, never negative.
    pub fn runtime_millis(&self) -> u64 {
        let elapsed = self
            .end_time
            .unwrap_or(0)
            .saturating_sub(self.begin_time.unwrap_or(0));
        elapsed.max(0) as u64
    }
}

/// Counts from the `Summary` document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoblySummaryEntry {
    pub requested: u32,
    pub executed: u32,
    pub passed: u32,
    pub failed: u32,
    /// Records reported as `ERROR` (after class-stage overrides).
    pub error: u32,
    /// Records reported as `SKIP`.
    pub skipped: u32,
}

/// One document of a summary file.
#[derive(Debug, Clone, PartialEq)]
pub enum MoblyDocEntry {
    Test(MoblyTestEntry),
    Summary(MoblySummaryEntry),
    /// Controller document kept as is; it has no fixed structure.
    ControllerInfo(Value),
    UserData { timestamp: Option<String>, data: Value },
}

/// Errors raised while reading a summary stream.
#[derive(Debug, thiserror::Error)]
pub enum MoblyYamlError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("unrecognized result {result:?} for test {test_name}")]
    UnknownResult { test_name: String, result: String },
}

/// Parses Mobly summary streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoblyYamlParser;

impl MoblyYamlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses every document of a summary stream.
    ///
    /// Documents of unknown type are logged and skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use xts_report_parser::mobly::{MoblyDocEntry, MoblyResult, MoblyYamlParser};
    ///
    /// let yaml = "\
    /// Type: Record
    /// Test Class: HelloTest
    /// Test Name: test_hello
    /// Result: PASS
    /// ---
    /// Type: Summary
    /// Requested: 1
    /// Executed: 1
    /// Passed: 1
    /// Failed: 0
    /// ";
    /// let entries = MoblyYamlParser::new().parse_str(yaml).unwrap();
    /// assert!(matches!(&entries[0], MoblyDocEntry::Test(t) if t.result == MoblyResult::Pass));
    /// assert!(matches!(&entries[1], MoblyDocEntry::Summary(s) if s.passed == 1));
    /// ```
    pub fn parse_str(&self, yaml: &str) -> Result<Vec<MoblyDocEntry>, MoblyYamlError> {
        let mut entries = Vec::new();
        let mut current_class: Option<String> = None;
        let mut class_setup_failed = false;
        let mut error_count = 0;
        let mut skipped_count = 0;

        for document in serde_yaml::Deserializer::from_str(yaml) {
            let doc = Value::deserialize(document)?;
            if doc.is_null() {
                continue;
            }

            let doc_type = doc.get(TYPE_KEY).and_then(Value::as_str).map(str::to_owned);
            match doc_type.as_deref() {
                Some(TYPE_RECORD) => {
                    let test_class = value_string(doc.get(TEST_CLASS)).unwrap_or_default();
                    if current_class.as_deref() != Some(test_class.as_str()) {
                        class_setup_failed = false;
                        current_class = Some(test_class.clone());
                    }

                    let test_name = value_string(doc.get(TEST_NAME)).unwrap_or_default();
                    let result = doc.get(RESULT);
                    if (test_name == STAGE_SETUP_CLASS || test_name == STAGE_PRE_RUN)
                        && result.and_then(Value::as_str) == Some("ERROR")
                    {
                        class_setup_failed = true;
                        continue;
                    }
                    if test_name == STAGE_TEARDOWN_CLASS || test_name == STAGE_CLEAN_UP {
                        continue;
                    }

                    let entry = parse_record(&doc, test_name, test_class, class_setup_failed)?;
                    match entry.result {
                        MoblyResult::Error => error_count += 1,
                        MoblyResult::Skip => skipped_count += 1,
                        _ => {}
                    }
                    entries.push(MoblyDocEntry::Test(entry));
                }
                Some(TYPE_SUMMARY) => {
                    entries.push(MoblyDocEntry::Summary(parse_summary(
                        &doc,
                        error_count,
                        skipped_count,
                    )));
                }
                Some(TYPE_CONTROLLER_INFO) => entries.push(MoblyDocEntry::ControllerInfo(doc)),
                Some(TYPE_USER_DATA) => entries.push(MoblyDocEntry::UserData {
                    timestamp: value_string(doc.get(USER_DATA_TIMESTAMP)),
                    data: doc,
                }),
                Some(TYPE_TEST_NAME_LIST) => {}
                Some(other) => warn!(doc_type = other, "skipping Mobly document of unknown type"),
                None => warn!("skipping Mobly document without a Type"),
            }
        }

        Ok(entries)
    }
}

fn parse_record(
    doc: &Value,
    test_name: String,
    test_class: String,
    class_setup_failed: bool,
) -> Result<MoblyTestEntry, MoblyYamlError> {
    let mut details = value_string(doc.get(DETAILS));
    let result = if class_setup_failed {
        MoblyResult::Error
    } else {
        match MoblyResult::from_value(doc.get(RESULT)) {
            Some(MoblyResult::Null) => {
                details = Some(INTERRUPTED_DETAILS.to_string());
                MoblyResult::Null
            }
            Some(result) => result,
            None => {
                let raw = value_string(doc.get(RESULT)).unwrap_or_default();
                error!(test = %test_name, result = %raw, "unrecognized Mobly result");
                return Err(MoblyYamlError::UnknownResult {
                    test_name,
                    result: raw,
                });
            }
        }
    };

    Ok(MoblyTestEntry {
        begin_time: value_millis(doc, BEGIN_TIME, &test_name),
        end_time: value_millis(doc, END_TIME, &test_name),
        stacktrace: value_string(doc.get(STACKTRACE)),
        uid: value_string(doc.get(UID)),
        signature: value_string(doc.get(SIGNATURE)),
        details,
        result,
        test_name,
        test_class,
    })
}

fn parse_summary(doc: &Value, error: u32, skipped: u32) -> MoblySummaryEntry {
    let count = |key: &str| -> Option<u32> {
        match doc.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    };

    match (
        count(SUMMARY_REQUESTED),
        count(SUMMARY_EXECUTED),
        count(SUMMARY_PASSED),
        count(SUMMARY_FAILED),
    ) {
        (Some(requested), Some(executed), Some(passed), Some(failed)) => MoblySummaryEntry {
            requested,
            executed,
            passed,
            failed,
            error,
            skipped,
        },
        _ => {
            error!("failed to parse Mobly summary counts");
            MoblySummaryEntry::default()
        }
    }
}

fn value_millis(doc: &Value, key: &str, test_name: &str) -> Option<i64> {
    let value = doc.get(key)?;
    let millis = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => return None,
        _ => None,
    };
    if millis.is_none() {
        error!(test = %test_name, field = key, "cannot parse Mobly timing info");
    }
    millis
}

/// Renders a scalar the way it appears in the summary file.
fn value_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => serde_yaml::to_string(other)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }
}
