//! Adapter for the canonical `test_result.xml` format.
//!
//! [`XmlReportParser`] reads a report written by the creator crate (or by
//! the test harness itself) back into a [`Report`]. Unknown elements are
//! ignored. Numeric attributes that do not parse are reported as
//! [`ParseError::InvalidReport`].
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use xts_report_parser::XmlReportParser;
//!
//! let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
//! <Result start="100" devices="serial">
//!   <Build build_fingerprint="fp" build_id="UP1A"/>
//!   <Summary pass="1" failed="0" modules_done="1" modules_total="1"/>
//!   <Module name="CtsFoo" abi="x86" done="true">
//!     <TestCase name="FooTest">
//!       <Test result="pass" name="testBar"/>
//!     </TestCase>
//!   </Module>
//! </Result>"#;
//!
//! let report = XmlReportParser::new().parse_str(xml, Path::new("inline.xml")).unwrap();
//! assert_eq!(report.build_fingerprint(), "fp");
//! assert_eq!(report.modules[0].test_cases[0].tests[0].result, "pass");
//! ```

use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;
use xts_report_core::{
    Attributes, BuildInfo, LoggedFile, Metric, Module, Reason, Report, Run, Summary, Test,
    TestCase, TestFailure,
};

use crate::adapter::ReportAdapter;
use crate::constants::*;
use crate::error::{ParseError, Result};

/// Parses `test_result.xml` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlReportParser;

impl XmlReportParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses the report at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn parse_file(&self, path: &Path) -> Result<Option<Report>> {
        let xml = match std::fs::read_to_string(path) {
            Ok(xml) => xml,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "report file not found");
                return Ok(None);
            }
            Err(source) => {
                return Err(ParseError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        self.parse_str(&xml, path).map(Some)
    }

    /// Parses XML text; `source` is only used in error messages.
    pub fn parse_str(&self, xml: &str, source: &Path) -> Result<Report> {
        let mut reader = Reader::from_str(xml);
        let mut builder = ReportBuilder::new(source);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => builder.start(&e)?,
                Ok(Event::Empty(e)) => {
                    builder.start(&e)?;
                    builder.end(e.name().as_ref());
                }
                Ok(Event::End(e)) => builder.end(e.name().as_ref()),
                Ok(Event::Text(e)) if builder.wants_text() => {
                    let text = e.unescape().map_err(|err| builder.xml_error(err))?;
                    builder.push_text(&text);
                }
                Ok(Event::CData(e)) if builder.wants_text() => {
                    builder.push_text(&String::from_utf8_lossy(&e));
                }
                Ok(Event::Eof) => break,
                Err(err) => {
                    return Err(builder.xml_error(format_args!(
                        "{err} at byte {}",
                        reader.error_position()
                    )));
                }
                Ok(_) => {}
            }
        }

        builder.finish()
    }
}

impl ReportAdapter for XmlReportParser {
    type Input = PathBuf;

    fn format(&self) -> &'static str {
        "xml"
    }

    fn source_path(&self, input: &PathBuf) -> Option<PathBuf> {
        Some(input.clone())
    }

    fn parse(&self, input: &PathBuf) -> Result<Option<Report>> {
        self.parse_file(input)
    }
}

/// Element whose text content is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextElement {
    StackTrace,
    BugReport,
    Logcat,
    Screenshot,
    Metric,
}

impl TextElement {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            t if t == STACKTRACE_TAG.as_bytes() => Some(Self::StackTrace),
            t if t == BUGREPORT_TAG.as_bytes() => Some(Self::BugReport),
            t if t == LOGCAT_TAG.as_bytes() => Some(Self::Logcat),
            t if t == SCREENSHOT_TAG.as_bytes() => Some(Self::Screenshot),
            t if t == METRIC_TAG.as_bytes() => Some(Self::Metric),
            _ => None,
        }
    }
}

/// Attributes of one element, decoded and unescaped.
struct ElementAttrs<'a> {
    tag: String,
    pairs: Vec<(String, String)>,
    source: &'a Path,
}

impl ElementAttrs<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    fn string(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|_| ParseError::InvalidReport {
                path: self.source.to_path_buf(),
                message: format!("invalid {key}={raw:?} on <{}>", self.tag),
            })
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|value| value.trim().eq_ignore_ascii_case("true"))
    }

    fn into_attributes(self) -> Attributes {
        self.pairs.into_iter().collect()
    }
}

/// Event-driven builder for the report tree.
struct ReportBuilder<'a> {
    source: &'a Path,
    report: Report,
    saw_result: bool,
    module: Option<Module>,
    test_case: Option<TestCase>,
    test: Option<Test>,
    failure: Option<TestFailure>,
    text_element: Option<TextElement>,
    text_label: String,
    text: String,
}

impl<'a> ReportBuilder<'a> {
    fn new(source: &'a Path) -> Self {
        Self {
            source,
            report: Report::default(),
            saw_result: false,
            module: None,
            test_case: None,
            test: None,
            failure: None,
            text_element: None,
            text_label: String::new(),
            text: String::new(),
        }
    }

    fn xml_error(&self, err: impl Display) -> ParseError {
        ParseError::Xml {
            path: self.source.to_path_buf(),
            message: err.to_string(),
        }
    }

    fn read_attrs(&self, e: &BytesStart) -> Result<ElementAttrs<'a>> {
        let mut pairs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.xml_error(err))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| self.xml_error(err))?
                .into_owned();
            pairs.push((key, value));
        }
        Ok(ElementAttrs {
            tag: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            pairs,
            source: self.source,
        })
    }

    fn wants_text(&self) -> bool {
        self.text_element.is_some()
    }

    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn start(&mut self, e: &BytesStart) -> Result<()> {
        let name = e.name();
        let tag = name.as_ref();

        if tag == RESULT_TAG.as_bytes() {
            self.saw_result = true;
            self.report.attributes = self.read_attrs(e)?.into_attributes();
        } else if tag == BUILD_TAG.as_bytes() {
            let attrs = self.read_attrs(e)?;
            let fingerprint = attrs.string(BUILD_FINGERPRINT_ATTR);
            self.report.build = Some(BuildInfo {
                build_fingerprint: fingerprint,
                attributes: attrs.into_attributes(),
            });
        } else if tag == RUN_HISTORY_TAG.as_bytes() {
            self.report.run_history.get_or_insert_with(Vec::new);
        } else if tag == RUN_TAG.as_bytes() {
            let attrs = self.read_attrs(e)?;
            let run = Run {
                start_time_millis: attrs.parse(START_TIME_ATTR)?,
                end_time_millis: attrs.parse(END_TIME_ATTR)?,
                passed_tests: attrs.parse(PASS_ATTR)?,
                failed_tests: attrs.parse(FAILED_ATTR)?,
                command_line_args: attrs.get(COMMAND_LINE_ARGS_ATTR).map(String::from),
                host_name: attrs.get(HOST_NAME_ATTR).map(String::from),
            };
            self.report.run_history.get_or_insert_with(Vec::new).push(run);
        } else if tag == SUMMARY_TAG.as_bytes() {
            let attrs = self.read_attrs(e)?;
            self.report.summary = Summary {
                passed: attrs.parse(PASS_ATTR)?.unwrap_or(0),
                failed: attrs.parse(FAILED_ATTR)?.unwrap_or(0),
                modules_done: attrs.parse(MODULES_DONE_ATTR)?.unwrap_or(0),
                modules_total: attrs.parse(MODULES_TOTAL_ATTR)?.unwrap_or(0),
            };
        } else if tag == MODULE_TAG.as_bytes() {
            let attrs = self.read_attrs(e)?;
            self.module = Some(Module {
                name: attrs.string(NAME_ATTR),
                abi: attrs.get(ABI_ATTR).map(String::from),
                runtime_millis: attrs.parse(RUNTIME_ATTR)?,
                done: attrs.flag(DONE_ATTR),
                passed: attrs.parse(PASS_ATTR)?,
                total_tests: attrs.parse(TOTAL_TESTS_ATTR)?,
                ..Module::default()
            });
        } else if tag == MODULES_NOT_DONE_REASON_TAG.as_bytes() {
            let attrs = self.read_attrs(e)?;
            if let Some(module) = self.module.as_mut() {
                module.reason = Some(Reason {
                    message: attrs.string(MESSAGE_ATTR),
                    error_name: attrs.string(ERROR_NAME_ATTR),
                    error_code: attrs.string(ERROR_CODE_ATTR),
                });
            }
        } else if tag == CASE_TAG.as_bytes() {
            let attrs = self.read_attrs(e)?;
            self.test_case = Some(TestCase::new(attrs.string(NAME_ATTR)));
        } else if tag == TEST_TAG.as_bytes() {
            let attrs = self.read_attrs(e)?;
            let mut test = Test::new(attrs.string(NAME_ATTR), attrs.string(RESULT_ATTR));
            test.skipped = attrs.flag(SKIPPED_ATTR).unwrap_or(false);
            self.test = Some(test);
        } else if tag == FAILURE_TAG.as_bytes() {
            let attrs = self.read_attrs(e)?;
            self.failure = Some(TestFailure {
                message: attrs.string(MESSAGE_ATTR),
                error_name: attrs.string(ERROR_NAME_ATTR),
                error_code: attrs.string(ERROR_CODE_ATTR),
                stack_trace: None,
            });
        } else if let Some(element) = TextElement::from_tag(tag) {
            let attrs = self.read_attrs(e)?;
            self.text_label = match element {
                TextElement::Metric => attrs.string(METRIC_KEY_ATTR),
                TextElement::StackTrace => String::new(),
                _ => attrs.string(LOG_FILE_NAME_ATTR),
            };
            self.text_element = Some(element);
            self.text.clear();
        }
        Ok(())
    }

    fn end(&mut self, tag: &[u8]) {
        if tag == MODULE_TAG.as_bytes() {
            if let Some(module) = self.module.take() {
                self.report.modules.push(module);
            }
        } else if tag == CASE_TAG.as_bytes() {
            if let (Some(case), Some(module)) = (self.test_case.take(), self.module.as_mut()) {
                module.test_cases.push(case);
            }
        } else if tag == TEST_TAG.as_bytes() {
            if let (Some(test), Some(case)) = (self.test.take(), self.test_case.as_mut()) {
                case.tests.push(test);
            }
        } else if tag == FAILURE_TAG.as_bytes() {
            if let Some(test) = self.test.as_mut() {
                test.failure = self.failure.take();
            }
        } else if let Some(element) = TextElement::from_tag(tag) {
            self.finish_text(element);
        }
    }

    fn finish_text(&mut self, element: TextElement) {
        self.text_element = None;
        let content = std::mem::take(&mut self.text);
        let label = std::mem::take(&mut self.text_label);

        if element == TextElement::StackTrace {
            if let Some(failure) = self.failure.as_mut() {
                failure.stack_trace = Some(content);
            }
            return;
        }

        let Some(test) = self.test.as_mut() else {
            return;
        };
        let file = LoggedFile {
            file_name: label,
            content,
        };
        match element {
            TextElement::BugReport => test.bug_report = Some(file),
            TextElement::Logcat => test.logcat = Some(file),
            TextElement::Screenshot => test.screenshots.push(file),
            TextElement::Metric => test.metrics.push(Metric {
                key: file.file_name,
                content: file.content,
            }),
            TextElement::StackTrace => {}
        }
    }

    fn finish(self) -> Result<Report> {
        if !self.saw_result {
            return Err(self.xml_error(format_args!("missing <{RESULT_TAG}> element")));
        }
        Ok(self.report)
    }
}
