//! Element and attribute names of the `test_result.xml` format.
//!
//! Shared by the XML adapter in this crate and the serializer in the
//! creator crate so both sides agree on the wire names.

pub const RESULT_TAG: &str = "Result";
pub const BUILD_TAG: &str = "Build";
pub const RUN_HISTORY_TAG: &str = "RunHistory";
pub const RUN_TAG: &str = "Run";
pub const SUMMARY_TAG: &str = "Summary";
pub const MODULE_TAG: &str = "Module";
pub const MODULES_NOT_DONE_REASON_TAG: &str = "Reason";
pub const CASE_TAG: &str = "TestCase";
pub const TEST_TAG: &str = "Test";
pub const FAILURE_TAG: &str = "Failure";
pub const STACKTRACE_TAG: &str = "StackTrace";
pub const BUGREPORT_TAG: &str = "BugReport";
pub const LOGCAT_TAG: &str = "Logcat";
pub const SCREENSHOT_TAG: &str = "Screenshot";
pub const METRIC_TAG: &str = "Metric";

pub const BUILD_FINGERPRINT_ATTR: &str = "build_fingerprint";
pub const START_TIME_ATTR: &str = "start";
pub const END_TIME_ATTR: &str = "end";
pub const PASS_ATTR: &str = "pass";
pub const FAILED_ATTR: &str = "failed";
pub const COMMAND_LINE_ARGS_ATTR: &str = "command_line_args";
pub const HOST_NAME_ATTR: &str = "host_name";
pub const MODULES_DONE_ATTR: &str = "modules_done";
pub const MODULES_TOTAL_ATTR: &str = "modules_total";
pub const NAME_ATTR: &str = "name";
pub const ABI_ATTR: &str = "abi";
pub const RUNTIME_ATTR: &str = "runtime";
pub const DONE_ATTR: &str = "done";
pub const TOTAL_TESTS_ATTR: &str = "total_tests";
pub const MESSAGE_ATTR: &str = "message";
pub const ERROR_NAME_ATTR: &str = "error_name";
pub const ERROR_CODE_ATTR: &str = "error_code";
pub const RESULT_ATTR: &str = "result";
pub const SKIPPED_ATTR: &str = "skipped";
pub const LOG_FILE_NAME_ATTR: &str = "file_name";
pub const METRIC_KEY_ATTR: &str = "key";

/// Processing instruction written before the `<Result>` element.
pub const STYLESHEET_PI: &str = r#"xml-stylesheet type="text/xsl" href="compatibility_result.xsl""#;
