//! Deterministic writer for the canonical `test_result.xml` format.
//!
//! Optional model fields are written only when set. Tests without a result
//! are skipped. Free text goes through [`sanitize_xml_content`] before
//! quick-xml escapes it, so the output is always well-formed XML 1.0.
//!
//! # Example
//!
//! ```
//! use xts_report_core::{BuildInfo, Module, Report, Test, TestCase};
//! use xts_report_creator::report_to_xml_string;
//!
//! let report = Report {
//!     build: Some(BuildInfo::new("fp")),
//!     modules: vec![Module::new("CtsFoo", "x86")
//!         .with_done(true)
//!         .with_test_case(TestCase::new("FooTest").with_test(Test::new("testBar", "pass")))],
//!     ..Report::default()
//! };
//! let xml = report_to_xml_string(&report).unwrap();
//! assert!(xml.contains(r#"<Test result="pass" name="testBar"/>"#));
//! ```

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use xts_report_core::{LoggedFile, Module, Report, Run, Test, TestCase, TestFailure};
use xts_report_parser::constants::*;

/// File name of the canonical report inside a result directory.
pub const TEST_RESULT_FILE_NAME: &str = "test_result.xml";

/// Writes `report` to `path`, replacing any existing file.
pub fn write_report_xml(report: &Report, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    write_report(report, &mut out)?;
    out.flush()
}

/// Renders `report` into an in-memory XML document.
pub fn report_to_xml_string(report: &Report) -> io::Result<String> {
    let mut buf = Vec::new();
    write_report(report, &mut buf)?;
    String::from_utf8(buf).map_err(io::Error::other)
}

/// Replaces characters that XML 1.0 cannot carry with U+FFFD.
///
/// Tab, line feed and carriage return are kept.
pub fn sanitize_xml_content(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if is_xml_char(c) { c } else { '\u{FFFD}' })
            .collect(),
    )
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn write_report<W: Write>(report: &Report, out: W) -> io::Result<()> {
    let mut xml = XmlOut::new(out);
    xml.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
    xml.event(Event::PI(BytesPI::new(STYLESHEET_PI)))?;

    let mut result = BytesStart::new(RESULT_TAG);
    for attr in &report.attributes {
        push_attr(&mut result, &attr.key, &attr.value);
    }
    xml.event(Event::Start(result))?;

    let mut build = BytesStart::new(BUILD_TAG);
    if let Some(info) = &report.build {
        for attr in &info.attributes {
            push_attr(&mut build, &attr.key, &attr.value);
        }
        if !info.build_fingerprint.is_empty()
            && !info.attributes.contains_key(BUILD_FINGERPRINT_ATTR)
        {
            push_attr(&mut build, BUILD_FINGERPRINT_ATTR, &info.build_fingerprint);
        }
    }
    xml.event(Event::Empty(build))?;

    if let Some(runs) = &report.run_history {
        xml.event(Event::Start(BytesStart::new(RUN_HISTORY_TAG)))?;
        for run in runs {
            xml.event(Event::Empty(run_element(run)))?;
        }
        xml.end(RUN_HISTORY_TAG)?;
    }

    let mut summary = BytesStart::new(SUMMARY_TAG);
    push_attr(&mut summary, PASS_ATTR, &report.summary.passed.to_string());
    push_attr(&mut summary, FAILED_ATTR, &report.summary.failed.to_string());
    push_attr(&mut summary, MODULES_DONE_ATTR, &report.summary.modules_done.to_string());
    push_attr(&mut summary, MODULES_TOTAL_ATTR, &report.summary.modules_total.to_string());
    xml.event(Event::Empty(summary))?;

    for module in &report.modules {
        write_module(&mut xml, module)?;
    }

    xml.end(RESULT_TAG)?;
    xml.into_inner().flush()
}

fn run_element(run: &Run) -> BytesStart<'static> {
    let mut element = BytesStart::new(RUN_TAG);
    if let Some(start) = run.start_time_millis {
        push_attr(&mut element, START_TIME_ATTR, &start.to_string());
    }
    if let Some(end) = run.end_time_millis {
        push_attr(&mut element, END_TIME_ATTR, &end.to_string());
    }
    if let Some(passed) = run.passed_tests {
        push_attr(&mut element, PASS_ATTR, &passed.to_string());
    }
    if let Some(failed) = run.failed_tests {
        push_attr(&mut element, FAILED_ATTR, &failed.to_string());
    }
    if let Some(args) = &run.command_line_args {
        push_attr(&mut element, COMMAND_LINE_ARGS_ATTR, args);
    }
    if let Some(host) = &run.host_name {
        push_attr(&mut element, HOST_NAME_ATTR, host);
    }
    element
}

fn write_module<W: Write>(xml: &mut XmlOut<W>, module: &Module) -> io::Result<()> {
    let mut element = BytesStart::new(MODULE_TAG);
    push_attr(&mut element, NAME_ATTR, &module.name);
    if let Some(abi) = &module.abi {
        push_attr(&mut element, ABI_ATTR, abi);
    }
    if let Some(runtime) = module.runtime_millis {
        push_attr(&mut element, RUNTIME_ATTR, &runtime.to_string());
    }
    if let Some(done) = module.done {
        push_attr(&mut element, DONE_ATTR, &done.to_string());
    }
    if let Some(passed) = module.passed {
        push_attr(&mut element, PASS_ATTR, &passed.to_string());
    }
    if let Some(total) = module.total_tests {
        push_attr(&mut element, TOTAL_TESTS_ATTR, &total.to_string());
    }

    if module.reason.is_none() && module.test_cases.is_empty() {
        return xml.event(Event::Empty(element));
    }
    xml.event(Event::Start(element))?;

    if let Some(reason) = &module.reason {
        let mut element = BytesStart::new(MODULES_NOT_DONE_REASON_TAG);
        push_text_attr(&mut element, MESSAGE_ATTR, &reason.message);
        push_error_attrs(&mut element, &reason.error_name, &reason.error_code);
        xml.event(Event::Empty(element))?;
    }
    for case in &module.test_cases {
        write_test_case(xml, case)?;
    }
    xml.end(MODULE_TAG)
}

fn write_test_case<W: Write>(xml: &mut XmlOut<W>, case: &TestCase) -> io::Result<()> {
    let mut element = BytesStart::new(CASE_TAG);
    push_attr(&mut element, NAME_ATTR, &case.name);

    let mut tests = case.tests.iter().filter(|test| test.was_executed()).peekable();
    if tests.peek().is_none() {
        return xml.event(Event::Empty(element));
    }
    xml.event(Event::Start(element))?;
    for test in tests {
        write_test(xml, test)?;
    }
    xml.end(CASE_TAG)
}

fn write_test<W: Write>(xml: &mut XmlOut<W>, test: &Test) -> io::Result<()> {
    let mut element = BytesStart::new(TEST_TAG);
    push_attr(&mut element, RESULT_ATTR, &test.result);
    push_attr(&mut element, NAME_ATTR, &test.name);
    if test.skipped {
        push_attr(&mut element, SKIPPED_ATTR, "true");
    }

    let has_log = |file: &Option<LoggedFile>| file.as_ref().is_some_and(|f| !f.content.is_empty());
    let has_children = test.failure.is_some()
        || has_log(&test.bug_report)
        || has_log(&test.logcat)
        || test.screenshots.iter().any(|f| !f.content.is_empty())
        || !test.metrics.is_empty();
    if !has_children {
        return xml.event(Event::Empty(element));
    }
    xml.event(Event::Start(element))?;

    if let Some(failure) = &test.failure {
        write_failure(xml, failure)?;
    }
    if let Some(file) = &test.bug_report {
        write_logged_file(xml, BUGREPORT_TAG, file)?;
    }
    if let Some(file) = &test.logcat {
        write_logged_file(xml, LOGCAT_TAG, file)?;
    }
    for file in &test.screenshots {
        write_logged_file(xml, SCREENSHOT_TAG, file)?;
    }
    for metric in &test.metrics {
        let mut element = BytesStart::new(METRIC_TAG);
        push_attr(&mut element, METRIC_KEY_ATTR, &metric.key);
        xml.text_element(element, METRIC_TAG, &metric.content)?;
    }
    xml.end(TEST_TAG)
}

fn write_failure<W: Write>(xml: &mut XmlOut<W>, failure: &TestFailure) -> io::Result<()> {
    let mut element = BytesStart::new(FAILURE_TAG);
    push_text_attr(&mut element, MESSAGE_ATTR, &failure.message);
    push_error_attrs(&mut element, &failure.error_name, &failure.error_code);

    let Some(stack_trace) = &failure.stack_trace else {
        return xml.event(Event::Empty(element));
    };
    xml.event(Event::Start(element))?;
    xml.text_element(BytesStart::new(STACKTRACE_TAG), STACKTRACE_TAG, stack_trace)?;
    xml.end(FAILURE_TAG)
}

fn write_logged_file<W: Write>(xml: &mut XmlOut<W>, tag: &str, file: &LoggedFile) -> io::Result<()> {
    if file.content.is_empty() {
        return Ok(());
    }
    let mut element = BytesStart::new(tag);
    push_attr(&mut element, LOG_FILE_NAME_ATTR, &file.file_name);
    xml.text_element(element, tag, &file.content)
}

fn push_attr(element: &mut BytesStart<'_>, key: &str, value: &str) {
    element.push_attribute((key, value));
}

fn push_text_attr(element: &mut BytesStart<'_>, key: &str, value: &str) {
    let value = sanitize_xml_content(value);
    element.push_attribute((key, &*value));
}

fn push_error_attrs(element: &mut BytesStart<'_>, error_name: &str, error_code: &str) {
    if !error_name.is_empty() && !error_code.is_empty() {
        push_attr(element, ERROR_NAME_ATTR, error_name);
        push_attr(element, ERROR_CODE_ATTR, error_code);
    }
}

/// quick-xml writer with two-space indentation and io errors.
struct XmlOut<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlOut<W> {
    fn new(out: W) -> Self {
        Self {
            writer: Writer::new_with_indent(out, b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> io::Result<()> {
        self.writer.write_event(event).map_err(io::Error::other)
    }

    fn end(&mut self, tag: &str) -> io::Result<()> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn text_element(&mut self, element: BytesStart<'_>, tag: &str, text: &str) -> io::Result<()> {
        self.event(Event::Start(element))?;
        self.event(Event::Text(BytesText::new(&sanitize_xml_content(text))))?;
        self.end(tag)
    }

    fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
