//! HTML rendering of a written `test_result.xml`.
//!
//! [`ReportCreator`](crate::ReportCreator) calls an [`HtmlRenderer`] after
//! the XML is on disk. [`DefaultHtmlRenderer`] reads the XML back with the
//! parser crate and renders a self-contained page with the build summary,
//! one row per module, and the failed tests.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use xts_report_core::{Module, Report};
use xts_report_parser::XmlReportParser;
use xts_report_parser::constants::{END_TIME_ATTR, START_TIME_ATTR};

use crate::error::{CreateError, Result};

/// File name of the rendered page inside a result directory.
pub const TEST_RESULT_HTML_FILE_NAME: &str = "test_result.html";

/// Turns a written report XML into an HTML page.
pub trait HtmlRenderer: Send + Sync {
    fn render(&self, xml_path: &Path, html_path: &Path) -> Result<()>;
}

/// Renders summary, module table and failures as plain HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHtmlRenderer {
    parser: XmlReportParser,
}

impl DefaultHtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `report` into a complete HTML document.
    pub fn render_report(&self, report: &Report) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
        html.push_str("<title>Test Report</title>\n");
        html.push_str("<link rel=\"stylesheet\" href=\"compatibility_result.css\">\n");
        html.push_str("</head>\n<body>\n");
        push_summary(&mut html, report);
        push_modules(&mut html, &report.modules);
        push_failures(&mut html, &report.modules);
        let _ = writeln!(
            html,
            "<p class=\"generated\">Generated {}</p>\n</body>\n</html>",
            Utc::now().to_rfc3339()
        );
        html
    }
}

impl HtmlRenderer for DefaultHtmlRenderer {
    fn render(&self, xml_path: &Path, html_path: &Path) -> Result<()> {
        let report = self
            .parser
            .parse_file(xml_path)
            .map_err(|err| CreateError::Html(err.to_string()))?
            .ok_or_else(|| {
                CreateError::Html(format!("{} does not exist", xml_path.display()))
            })?;
        fs::write(html_path, self.render_report(&report))?;
        Ok(())
    }
}

fn push_summary(html: &mut String, report: &Report) {
    html.push_str("<h1>Test Report</h1>\n<table class=\"summary\">\n");
    push_row(html, "Build fingerprint", report.build_fingerprint());
    if let Some(start) = report.attributes.get(START_TIME_ATTR) {
        push_row(html, "Start time", &format_millis(start));
    }
    if let Some(end) = report.attributes.get(END_TIME_ATTR) {
        push_row(html, "End time", &format_millis(end));
    }
    push_row(html, "Tests passed", &report.summary.passed.to_string());
    push_row(html, "Tests failed", &report.summary.failed.to_string());
    push_row(
        html,
        "Modules done",
        &format!("{} of {}", report.summary.modules_done, report.summary.modules_total),
    );
    html.push_str("</table>\n");
}

fn push_row(html: &mut String, label: &str, value: &str) {
    let _ = writeln!(html, "<tr><th>{}</th><td>{}</td></tr>", escape(label), escape(value));
}

fn push_modules(html: &mut String, modules: &[Module]) {
    html.push_str("<h2>Modules</h2>\n<table class=\"modules\">\n");
    html.push_str("<tr><th>Module</th><th>Passed</th><th>Failed</th><th>Total</th><th>Done</th></tr>\n");
    for module in modules {
        let failed = failed_tests(module).count();
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&module.module_id()),
            module.passed.unwrap_or(0),
            failed,
            module.total_tests.unwrap_or(0),
            module.is_done()
        );
    }
    html.push_str("</table>\n");
}

fn push_failures(html: &mut String, modules: &[Module]) {
    let mut failures = modules
        .iter()
        .flat_map(|module| failed_tests(module).map(move |(case, test)| (module, case, test)))
        .peekable();
    if failures.peek().is_none() {
        return;
    }

    html.push_str("<h2>Failed tests</h2>\n<table class=\"failures\">\n");
    html.push_str("<tr><th>Module</th><th>Test</th><th>Details</th></tr>\n");
    for (module, case, test) in failures {
        let (message, stack_trace) = test
            .failure
            .as_ref()
            .map(|f| (f.message.as_str(), f.stack_trace.as_deref().unwrap_or("")))
            .unwrap_or(("", ""));
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}#{}</td><td>{}<pre>{}</pre></td></tr>",
            escape(&module.module_id()),
            escape(case),
            escape(&test.name),
            escape(message),
            escape(stack_trace)
        );
    }
    html.push_str("</table>\n");
}

fn failed_tests(module: &Module) -> impl Iterator<Item = (&str, &xts_report_core::Test)> {
    module.test_cases.iter().flat_map(|case| {
        case.tests
            .iter()
            .filter(|test| test.result == "fail")
            .map(move |test| (case.name.as_str(), test))
    })
}

fn format_millis(value: &str) -> String {
    value
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| value.to_string())
}
