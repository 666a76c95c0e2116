//! Merging of partial reports for one device build.
//!
//! A test-suite invocation is often split across shards, devices or modules,
//! each producing its own partial [`Report`]. [`merge_reports`] folds those
//! partial reports into a single report whose aggregate counts, module list
//! and `<Result>` attributes describe the whole invocation.
//!
//! Reports without a build fingerprint are ignored. Reports describing
//! different builds are never merged: validation fails and `None` is
//! returned.
//!
//! # Example
//!
//! ```
//! use xts_report_core::*;
//!
//! let shard = |module: &str, passed: u64| Report {
//!     build: Some(BuildInfo::new("google/bramble/bramble:14/UP1A/1:user/release-keys")),
//!     summary: Summary { passed, failed: 0, modules_done: 1, modules_total: 1 },
//!     modules: vec![Module::new(module, "arm64-v8a").with_done(true)],
//!     ..Report::default()
//! };
//!
//! let merged = merge_reports(vec![shard("CtsFooTestCases", 3), shard("CtsBarTestCases", 4)], true)
//!     .expect("same build");
//! assert_eq!(merged.summary.passed, 7);
//! assert_eq!(merged.summary.modules_done, 2);
//! assert_eq!(merged.modules.len(), 2);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    Attributes, BuildInfo, Module, ParseResult, Report, Run, Summary, TestCase,
    validate_build_fingerprints,
};

pub const START_TIME_ATTR: &str = "start";
pub const END_TIME_ATTR: &str = "end";
pub const START_DISPLAY_TIME_ATTR: &str = "start_display";
pub const END_DISPLAY_TIME_ATTR: &str = "end_display";
pub const DEVICES_ATTR: &str = "devices";
pub const COMMAND_LINE_ARGS_ATTR: &str = "command_line_args";

/// Build attributes kept in a merged report besides the `build_` ones.
const KEPT_BUILD_ATTRS: [&str; 3] = ["device_kernel_info", "system_img_info", "vendor_img_info"];

/// Merges reports of the same device build into one report.
///
/// Unusable reports (no build or empty fingerprint) are dropped first. With
/// `validate` set, any fingerprint mismatch or an empty usable set yields
/// `None`. A single usable report is returned as is.
pub fn merge_reports(reports: Vec<Report>, validate: bool) -> Option<Report> {
    let usable: Vec<Report> = reports.into_iter().filter(Report::is_usable).collect();

    if validate {
        let entries: Vec<(Option<&Path>, &Report)> =
            usable.iter().map(|report| (None, report)).collect();
        if !validate_build_fingerprints(&entries).is_empty() {
            return None;
        }
    }

    merge_usable(usable)
}

/// Merges the reports carried by parse results.
///
/// Always validates build fingerprints, so mismatch warnings name the file
/// each report came from.
pub fn merge_parsed_reports(parse_results: Vec<ParseResult>) -> Option<Report> {
    let usable: Vec<(Option<PathBuf>, Report)> = parse_results
        .into_iter()
        .filter_map(|result| match result.report {
            Some(report) if report.is_usable() => Some((result.source, report)),
            _ => None,
        })
        .collect();

    let entries: Vec<(Option<&Path>, &Report)> = usable
        .iter()
        .map(|(source, report)| (source.as_deref(), report))
        .collect();
    if !validate_build_fingerprints(&entries).is_empty() {
        return None;
    }

    merge_reports(usable.into_iter().map(|(_, report)| report).collect(), false)
}

fn merge_usable(mut reports: Vec<Report>) -> Option<Report> {
    match reports.len() {
        0 => return None,
        1 => return reports.pop(),
        _ => {}
    }

    debug!(reports = reports.len(), "merging reports");

    let attributes = merge_attributes(&reports);
    let build = reports.first().and_then(|report| report.build.as_ref()).map(merged_build_info);

    let mut summary = Summary::default();
    let mut run_history: Vec<Run> = Vec::new();
    let mut all_modules: Vec<Module> = Vec::new();
    for report in reports {
        summary.passed = summary.passed.saturating_add(report.summary.passed);
        summary.failed = summary.failed.saturating_add(report.summary.failed);
        run_history.extend(report.run_history.into_iter().flatten());
        all_modules.extend(report.modules);
    }

    let modules = merge_modules(all_modules);
    summary.modules_done = modules.iter().filter(|module| module.is_done()).count() as u32;
    summary.modules_total = modules.len() as u32;

    Some(Report {
        attributes,
        build,
        run_history: (!run_history.is_empty()).then_some(run_history),
        summary,
        modules,
    })
}

fn merged_build_info(build: &BuildInfo) -> BuildInfo {
    let mut attributes = build.attributes.clone();
    attributes.retain(|attr| {
        attr.key.starts_with("build_") || KEPT_BUILD_ATTRS.contains(&attr.key.as_str())
    });
    BuildInfo {
        build_fingerprint: build.build_fingerprint.clone(),
        attributes,
    }
}

/// Groups items by key, keeping groups in first-seen order.
fn group_in_order<T>(items: Vec<T>, key: impl Fn(&T) -> String) -> Vec<Vec<T>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<T>> = Vec::new();
    for item in items {
        let slot = *index.entry(key(&item)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(item);
    }
    groups
}

/// Merges modules sharing `name` and `abi`.
///
/// Single-member groups are returned unchanged.
fn merge_modules(modules: Vec<Module>) -> Vec<Module> {
    group_in_order(modules, Module::merge_key)
        .into_iter()
        .filter_map(merge_module_group)
        .collect()
}

fn merge_module_group(group: Vec<Module>) -> Option<Module> {
    let mut members = group.into_iter();
    let mut merged = members.next()?;
    let mut test_cases = std::mem::take(&mut merged.test_cases);

    for module in members {
        // Counts come straight from the input files; clamp instead of wrapping.
        merged.runtime_millis = Some(
            merged
                .runtime_millis
                .unwrap_or(0)
                .saturating_add(module.runtime_millis.unwrap_or(0)),
        );
        merged.done = Some(merged.is_done() && module.is_done());
        merged.passed = Some(
            merged
                .passed
                .unwrap_or(0)
                .saturating_add(module.passed.unwrap_or(0)),
        );
        merged.total_tests = Some(
            merged
                .total_tests
                .unwrap_or(0)
                .saturating_add(module.total_tests.unwrap_or(0)),
        );
        // Later reasons overwrite earlier ones.
        if module.reason.is_some() {
            merged.reason = module.reason;
        }
        test_cases.extend(module.test_cases);
    }

    merged.test_cases = merge_test_cases(test_cases);
    Some(merged)
}

/// Merges test cases by name. Tests are concatenated without deduplication.
fn merge_test_cases(test_cases: Vec<TestCase>) -> Vec<TestCase> {
    group_in_order(test_cases, |case| case.name.clone())
        .into_iter()
        .filter_map(|group| {
            let mut cases = group.into_iter();
            let mut merged = cases.next()?;
            for case in cases {
                merged.tests.extend(case.tests);
            }
            Some(merged)
        })
        .collect()
}

fn parse_millis(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

/// Builds the `<Result>` attributes of the merged report.
///
/// Attributes are collected first-wins across reports; then the time range
/// is widened to the earliest start and latest end, device serials are
/// concatenated, and `command_line_args` is dropped.
fn merge_attributes(reports: &[Report]) -> Attributes {
    let mut merged = Attributes::new();
    let mut start: Option<(i64, String)> = None;
    let mut end: Option<(i64, String)> = None;
    let mut devices: Vec<String> = Vec::new();

    for report in reports {
        let attrs = &report.attributes;
        for attr in attrs {
            merged.put_if_absent(&attr.key, &attr.value);
            match attr.key.as_str() {
                START_TIME_ATTR => {
                    if let Some(time) = parse_millis(&attr.value) {
                        if start.as_ref().is_none_or(|(current, _)| time < *current) {
                            let display = attrs.get(START_DISPLAY_TIME_ATTR).unwrap_or("");
                            start = Some((time, display.to_string()));
                        }
                    }
                }
                END_TIME_ATTR => {
                    if let Some(time) = parse_millis(&attr.value) {
                        if end.as_ref().is_none_or(|(current, _)| time > *current) {
                            let display = attrs.get(END_DISPLAY_TIME_ATTR).unwrap_or("");
                            end = Some((time, display.to_string()));
                        }
                    }
                }
                DEVICES_ATTR => devices.push(attr.value.trim().to_string()),
                _ => {}
            }
        }
    }

    let (start_time, start_display) = split_time(start);
    let (end_time, end_display) = split_time(end);
    merged.insert(START_TIME_ATTR, start_time);
    merged.insert(END_TIME_ATTR, end_time);
    merged.insert(START_DISPLAY_TIME_ATTR, start_display);
    merged.insert(END_DISPLAY_TIME_ATTR, end_display);
    merged.remove(COMMAND_LINE_ARGS_ATTR);
    merged.insert(DEVICES_ATTR, devices.join(","));
    merged
}

fn split_time(time: Option<(i64, String)>) -> (String, String) {
    time.map(|(millis, display)| (millis.to_string(), display))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Reason, Test};

    const FP: &str = "google/bramble/bramble:14/UP1A/1:user/release-keys";

    fn report_with(
        fingerprint: &str,
        attrs: &[(&str, &str)],
        summary: (u64, u64),
        modules: Vec<Module>,
    ) -> Report {
        Report {
            attributes: attrs.iter().copied().collect(),
            build: Some(BuildInfo::new(fingerprint)),
            run_history: None,
            summary: Summary {
                passed: summary.0,
                failed: summary.1,
                modules_done: 0,
                modules_total: 0,
            },
            modules,
        }
    }

    fn simple(fingerprint: &str) -> Report {
        report_with(fingerprint, &[], (1, 0), vec![Module::new("M", "x86").with_done(true)])
    }

    #[test]
    fn test_oversized_counts_saturate() {
        let shard = |passed: u32, runtime: u64| {
            let mut module = Module::new("M", "x86").with_done(true);
            module.passed = Some(passed);
            module.total_tests = Some(passed);
            module.runtime_millis = Some(runtime);
            report_with(FP, &[], (u64::MAX, u64::MAX - 1), vec![module])
        };

        let merged = merge_reports(vec![shard(u32::MAX, u64::MAX), shard(1, 1)], true).unwrap();
        assert_eq!(merged.summary.passed, u64::MAX);
        assert_eq!(merged.summary.failed, u64::MAX);
        assert_eq!(merged.modules.len(), 1);
        let module = &merged.modules[0];
        assert_eq!(module.passed, Some(u32::MAX));
        assert_eq!(module.total_tests, Some(u32::MAX));
        assert_eq!(module.runtime_millis, Some(u64::MAX));
    }

    #[test]
    fn test_single_report_is_returned_unchanged() {
        let mut report = report_with(
            FP,
            &[("start", "5"), ("command_line_args", "cts")],
            (3, 1),
            vec![Module::new("M", "x86")],
        );
        report.build = Some(BuildInfo::new(FP).with_attribute("product", "bramble"));
        let merged = merge_reports(vec![report.clone()], true).unwrap();
        assert_eq!(merged, report);
    }

    #[test]
    fn test_unusable_reports_are_dropped_before_single_shortcut() {
        let report = simple(FP);
        let no_build = Report::default();
        let empty_fp = report_with("", &[], (9, 9), vec![]);
        let merged = merge_reports(vec![no_build, report.clone(), empty_fp], true).unwrap();
        assert_eq!(merged, report);
    }

    #[test]
    fn test_no_usable_reports_yields_none() {
        assert_eq!(merge_reports(vec![], true), None);
        assert_eq!(merge_reports(vec![Report::default()], false), None);
    }

    #[test]
    fn test_fingerprint_mismatch_yields_none() {
        assert_eq!(merge_reports(vec![simple("A"), simple("B")], true), None);
        assert_eq!(merge_reports(vec![simple("A"), simple("A"), simple("B")], true), None);
    }

    #[test]
    fn test_parsed_reports_validate_and_skip_missing() {
        let ok = merge_parsed_reports(vec![
            ParseResult::new(Some(PathBuf::from("a.xml")), Some(simple(FP))),
            ParseResult::new(Some(PathBuf::from("b.xml")), None),
            ParseResult::new(None, Some(simple(FP))),
        ])
        .unwrap();
        assert_eq!(ok.summary.passed, 2);

        let mismatch = merge_parsed_reports(vec![
            ParseResult::new(Some(PathBuf::from("a.xml")), Some(simple("A"))),
            ParseResult::new(Some(PathBuf::from("b.xml")), Some(simple("B"))),
        ]);
        assert_eq!(mismatch, None);
        assert_eq!(merge_parsed_reports(vec![]), None);
    }

    #[test]
    fn test_counts_are_conserved() {
        let a = report_with(FP, &[], (10, 2), vec![Module::new("A", "x86").with_done(true)]);
        let b = report_with(FP, &[], (5, 3), vec![Module::new("B", "x86").with_done(false)]);
        let c = report_with(FP, &[], (0, 1), vec![]);
        let merged = merge_reports(vec![a, b, c], true).unwrap();
        assert_eq!(merged.summary.passed, 15);
        assert_eq!(merged.summary.failed, 6);
        assert_eq!(merged.summary.modules_done, 1);
        assert_eq!(merged.summary.modules_total, 2);
    }

    #[test]
    fn test_modules_grouped_by_name_and_abi() {
        let a = report_with(
            FP,
            &[],
            (0, 0),
            vec![
                Module::new("M", "arm64-v8a")
                    .with_done(true)
                    .with_runtime_millis(100)
                    .with_counts(3, 4)
                    .with_test_case(TestCase::new("C").with_test(Test::new("t1", "pass"))),
                Module::new("M", "armeabi-v7a").with_done(true),
            ],
        );
        let b = report_with(
            FP,
            &[],
            (0, 0),
            vec![
                Module::new("M", "arm64-v8a")
                    .with_done(false)
                    .with_runtime_millis(50)
                    .with_counts(1, 2)
                    .with_reason(Reason::new("crashed"))
                    .with_test_case(TestCase::new("C").with_test(Test::new("t2", "fail")))
                    .with_test_case(TestCase::new("D").with_test(Test::new("t3", "pass"))),
            ],
        );

        let merged = merge_reports(vec![a, b], true).unwrap();
        assert_eq!(merged.modules.len(), 2);

        let m = &merged.modules[0];
        assert_eq!(m.abi.as_deref(), Some("arm64-v8a"));
        assert_eq!(m.runtime_millis, Some(150));
        assert_eq!(m.done, Some(false));
        assert_eq!(m.passed, Some(4));
        assert_eq!(m.total_tests, Some(6));
        assert_eq!(m.reason, Some(Reason::new("crashed")));
        let case_names: Vec<&str> = m.test_cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(case_names, vec!["C", "D"]);
        let tests: Vec<&str> = m.test_cases[0].tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tests, vec!["t1", "t2"]);

        assert_eq!(merged.modules[1].abi.as_deref(), Some("armeabi-v7a"));
        assert_eq!(merged.summary.modules_done, 1);
        assert_eq!(merged.summary.modules_total, 2);
    }

    #[test]
    fn test_module_done_requires_every_member_done() {
        let done = |flag: bool| report_with(FP, &[], (0, 0), vec![Module::new("M", "x86").with_done(flag)]);
        let merged = merge_reports(vec![done(true), done(true)], true).unwrap();
        assert_eq!(merged.modules[0].done, Some(true));

        let merged = merge_reports(vec![done(true), done(false), done(true)], true).unwrap();
        assert_eq!(merged.modules[0].done, Some(false));
    }

    #[test]
    fn test_last_reason_wins() {
        let with_reason = |reason: Option<&str>| {
            let mut module = Module::new("M", "x86");
            module.reason = reason.map(Reason::new);
            report_with(FP, &[], (0, 0), vec![module])
        };
        let merged = merge_reports(
            vec![with_reason(Some("first")), with_reason(Some("second")), with_reason(None)],
            true,
        )
        .unwrap();
        assert_eq!(merged.modules[0].reason, Some(Reason::new("second")));
    }

    #[test]
    fn test_identical_tests_are_not_deduplicated() {
        let shard = || {
            report_with(
                FP,
                &[],
                (1, 0),
                vec![Module::new("M", "x86")
                    .with_test_case(TestCase::new("C").with_test(Test::new("t", "pass")))],
            )
        };
        let merged = merge_reports(vec![shard(), shard()], true).unwrap();
        assert_eq!(merged.modules[0].test_cases[0].tests.len(), 2);
    }

    #[test]
    fn test_single_member_module_group_is_untouched() {
        let module = Module::new("Only", "x86");
        let merged = merge_reports(
            vec![
                report_with(FP, &[], (0, 0), vec![module.clone()]),
                report_with(FP, &[], (0, 0), vec![]),
            ],
            true,
        )
        .unwrap();
        assert_eq!(merged.modules, vec![module]);
        assert_eq!(merged.summary.modules_done, 0);
    }

    #[test]
    fn test_result_attributes_are_recomputed() {
        let a = report_with(
            FP,
            &[
                ("start", "2000"),
                ("end", "5000"),
                ("start_display", "S-2000"),
                ("end_display", "E-5000"),
                ("suite_name", "CTS"),
                ("command_line_args", "cts -m A"),
                ("devices", " serial1 "),
            ],
            (0, 0),
            vec![],
        );
        let b = report_with(
            FP,
            &[
                ("start", "1000"),
                ("end", "9000"),
                ("start_display", "S-1000"),
                ("end_display", "E-9000"),
                ("suite_name", "GTS"),
                ("command_line_args", "cts -m B"),
                ("devices", "serial1"),
                ("host_name", "lab-1"),
            ],
            (0, 0),
            vec![],
        );

        let merged = merge_reports(vec![a, b], true).unwrap();
        let attrs = &merged.attributes;
        assert_eq!(attrs.get("start"), Some("1000"));
        assert_eq!(attrs.get("start_display"), Some("S-1000"));
        assert_eq!(attrs.get("end"), Some("9000"));
        assert_eq!(attrs.get("end_display"), Some("E-9000"));
        assert_eq!(attrs.get("suite_name"), Some("CTS"));
        assert_eq!(attrs.get("devices"), Some("serial1,serial1"));
        assert_eq!(attrs.get("command_line_args"), None);
        assert_eq!(
            attrs.keys().collect::<Vec<_>>(),
            vec!["start", "end", "start_display", "end_display", "suite_name", "devices", "host_name"]
        );
    }

    #[test]
    fn test_time_attributes_present_even_when_unparseable() {
        let a = report_with(FP, &[("start", "not-a-number"), ("suite_name", "CTS")], (0, 0), vec![]);
        let b = report_with(FP, &[("end", "")], (0, 0), vec![]);
        let merged = merge_reports(vec![a, b], true).unwrap();
        let attrs = &merged.attributes;
        assert_eq!(attrs.get("start"), Some(""));
        assert_eq!(attrs.get("end"), Some(""));
        assert_eq!(attrs.get("start_display"), Some(""));
        assert_eq!(attrs.get("end_display"), Some(""));
        assert_eq!(attrs.get("devices"), Some(""));
    }

    #[test]
    fn test_start_display_comes_from_same_report_even_if_missing() {
        let a = report_with(FP, &[("start", "200"), ("start_display", "later")], (0, 0), vec![]);
        let b = report_with(FP, &[("start", " 100 ")], (0, 0), vec![]);
        let merged = merge_reports(vec![a, b], true).unwrap();
        assert_eq!(merged.attributes.get("start"), Some("100"));
        assert_eq!(merged.attributes.get("start_display"), Some(""));
    }

    #[test]
    fn test_build_info_keeps_build_and_image_attributes() {
        let mut a = simple(FP);
        a.build = Some(
            BuildInfo::new(FP)
                .with_attribute("build_id", "UP1A")
                .with_attribute("device_kernel_info", "5.10")
                .with_attribute("adb_version", "35")
                .with_attribute("system_img_info", "sys")
                .with_attribute("vendor_img_info", "ven"),
        );
        let mut b = simple(FP);
        b.build = Some(BuildInfo::new(FP).with_attribute("build_id", "OTHER"));

        let merged = merge_reports(vec![a, b], true).unwrap();
        let build = merged.build.unwrap();
        assert_eq!(build.build_fingerprint, FP);
        assert_eq!(
            build.attributes.keys().collect::<Vec<_>>(),
            vec!["build_id", "device_kernel_info", "system_img_info", "vendor_img_info"]
        );
        assert_eq!(build.attributes.get("build_id"), Some("UP1A"));
    }

    #[test]
    fn test_run_history_concatenated_or_absent() {
        let run = |host: &str| Run {
            host_name: Some(host.to_string()),
            ..Run::default()
        };
        let mut a = simple(FP);
        a.run_history = Some(vec![run("h1")]);
        let mut b = simple(FP);
        b.run_history = Some(vec![run("h2"), run("h3")]);
        let merged = merge_reports(vec![a, simple(FP), b], true).unwrap();
        let hosts: Vec<_> = merged
            .run_history
            .unwrap()
            .into_iter()
            .map(|r| r.host_name.unwrap())
            .collect();
        assert_eq!(hosts, vec!["h1", "h2", "h3"]);

        let merged = merge_reports(vec![simple(FP), simple(FP)], true).unwrap();
        assert_eq!(merged.run_history, None);
    }

    #[test]
    fn test_merge_without_validation_uses_first_build() {
        let merged = merge_reports(vec![simple("A"), simple("B")], false).unwrap();
        assert_eq!(merged.build_fingerprint(), "A");
        assert_eq!(merged.summary.passed, 2);
    }
}
