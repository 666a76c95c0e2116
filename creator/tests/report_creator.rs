use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use xts_report_core::{BuildInfo, Module, Report, Summary, Test, TestCase, TestFailure};
use xts_report_creator::{
    CHECKSUM_FILE_NAME, OutputConfig, RESOURCE_FILES, ReportChecksum, ReportCreator,
    TEST_RESULT_FILE_NAME, TEST_RESULT_HTML_FILE_NAME,
};
use xts_report_parser::{ParseOrchestrator, ReportMerger, XmlReportParser, build_thread_pool};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FP: &str = "google/bramble/bramble:14/UP1A/1:user/release-keys";

fn resources(root: &Path) -> PathBuf {
    let dir = root.join("resources");
    fs::create_dir_all(&dir).unwrap();
    for name in RESOURCE_FILES {
        fs::write(dir.join(name), format!("resource {name}")).unwrap();
    }
    dir
}

fn full_config(root: &Path) -> OutputConfig {
    OutputConfig {
        resource_dir: Some(resources(root)),
        create_zip: true,
        create_html: true,
    }
}

fn sample_report() -> Report {
    Report {
        attributes: [("start", "1000"), ("end", "5000"), ("devices", "A,B")]
            .into_iter()
            .collect(),
        build: Some(BuildInfo::new(FP).with_attribute("build_id", "UP1A")),
        run_history: None,
        summary: Summary {
            passed: 1,
            failed: 1,
            modules_done: 1,
            modules_total: 1,
        },
        modules: vec![Module::new("CtsFoo", "arm64-v8a")
            .with_done(true)
            .with_counts(1, 2)
            .with_test_case(
                TestCase::new("FooTest")
                    .with_test(Test::new("testPass", "pass"))
                    .with_test(Test::new("testFail", "fail").with_failure(
                        TestFailure::new("assert <x>").with_stack_trace("at Foo\nat Bar"),
                    )),
            )],
    }
}

// ---------------------------------------------------------------------------
// Full result directory
// ---------------------------------------------------------------------------

#[test]
fn test_create_report_produces_all_artifacts() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("2024.05.01_10.00.00");
    let report = sample_report();

    let created = ReportCreator::new(full_config(root.path()))
        .create_report(&report, &dir, Some(&b"\x08\x01"[..]))
        .unwrap();

    assert_eq!(created.xml, dir.join(TEST_RESULT_FILE_NAME));
    for name in RESOURCE_FILES {
        assert!(dir.join(name).is_file(), "{name} was not copied");
    }
    assert_eq!(created.checksum, Some(dir.join(CHECKSUM_FILE_NAME)));
    assert_eq!(fs::read(created.test_record.unwrap()).unwrap(), b"\x08\x01");
    assert_eq!(created.zip, Some(root.path().join("2024.05.01_10.00.00.zip")));
    assert_eq!(created.html, Some(dir.join(TEST_RESULT_HTML_FILE_NAME)));

    let parsed = XmlReportParser::new().parse_file(&created.xml).unwrap().unwrap();
    assert_eq!(parsed.build_fingerprint(), FP);
    assert_eq!(parsed.summary, report.summary);
    assert_eq!(parsed.modules[0].test_cases[0].tests.len(), 2);

    let checksum = ReportChecksum::load(&dir).unwrap();
    let module = &report.modules[0];
    assert!(checksum.contains_module_result(module));
    for test in &module.test_cases[0].tests {
        assert!(checksum.contains_test_result(test, module, "FooTest"));
    }
    assert!(checksum.contains_file(
        "2024.05.01_10.00.00/test_result.xml",
        &dir.join(TEST_RESULT_FILE_NAME)
    ));
    assert!(checksum.contains_file(
        "2024.05.01_10.00.00/logo.png",
        &dir.join("logo.png")
    ));

    let archive = zip::ZipArchive::new(File::open(created.zip.unwrap()).unwrap()).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"2024.05.01_10.00.00/test_result.xml"));
    assert!(names.contains(&"2024.05.01_10.00.00/proto/test-record.pb"));
    assert!(names.contains(&"2024.05.01_10.00.00/checksum-suite.json"));

    let html = fs::read_to_string(dir.join(TEST_RESULT_HTML_FILE_NAME)).unwrap();
    assert!(html.contains("FooTest#testFail"));
    assert!(html.contains("assert &lt;x&gt;"));
}

#[test]
fn test_rewriting_a_directory_replaces_previous_output() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("results");
    let creator = ReportCreator::new(OutputConfig {
        resource_dir: None,
        create_zip: false,
        create_html: false,
    });

    creator.create_report(&sample_report(), &dir, None).unwrap();
    let mut second = sample_report();
    second.modules[0].name = "CtsBar".to_string();
    creator.create_report(&second, &dir, None).unwrap();

    let parsed = XmlReportParser::new()
        .parse_file(&dir.join(TEST_RESULT_FILE_NAME))
        .unwrap()
        .unwrap();
    assert_eq!(parsed.modules.len(), 1);
    assert_eq!(parsed.modules[0].name, "CtsBar");
}

// ---------------------------------------------------------------------------
// Merge then create
// ---------------------------------------------------------------------------

#[test]
fn test_merged_shards_survive_a_write_and_reparse() {
    let root = TempDir::new().unwrap();
    let shard = |name: &str, module: &str, start: &str| {
        let path = root.path().join(name);
        fs::write(
            &path,
            format!(
                r#"<Result start="{start}" end="9000" devices="{name}">
  <Build build_fingerprint="{FP}" build_id="UP1A"/>
  <Summary pass="1" failed="0" modules_done="1" modules_total="1"/>
  <Module name="{module}" abi="x86" runtime="7" done="true" pass="1" total_tests="1">
    <TestCase name="Case"><Test result="pass" name="test"/></TestCase>
  </Module>
</Result>"#
            ),
        )
        .unwrap();
        path
    };
    let inputs = vec![shard("a.xml", "CtsA", "300"), shard("b.xml", "CtsB", "200")];

    let merger = ReportMerger::new(ParseOrchestrator::new(
        build_thread_pool(2).unwrap(),
        Duration::from_secs(30),
    ));
    let merged = merger.merge_xml_reports(inputs).unwrap().unwrap();

    let dir = root.path().join("merged");
    let created = ReportCreator::new(OutputConfig {
        resource_dir: None,
        create_zip: false,
        create_html: true,
    })
    .create_report(&merged, &dir, None)
    .unwrap();

    let reparsed = XmlReportParser::new().parse_file(&created.xml).unwrap().unwrap();
    assert_eq!(reparsed.summary, merged.summary);
    assert_eq!(reparsed.summary.passed, 2);
    assert_eq!(reparsed.summary.modules_total, 2);
    assert_eq!(reparsed.attributes.get("start"), Some("200"));
    assert_eq!(reparsed.attributes.get("devices"), Some("a.xml,b.xml"));
    let names: Vec<&str> = reparsed.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["CtsA", "CtsB"]);
}
