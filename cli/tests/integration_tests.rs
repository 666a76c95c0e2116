use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path =
            std::env::temp_dir().join(format!("xts_report_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

const FP: &str = "google/bramble/bramble:14/UP1A/1:user/release-keys";

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xts-report"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run xts-report")
}

fn write_shard(dir: &TempDir, name: &str, fingerprint: &str, module: &str) -> PathBuf {
    let xml = format!(
        r#"<?xml version='1.0' encoding='UTF-8' standalone='no' ?>
<Result start="100" end="200" devices="{name}" command_line_args="cts">
  <Build build_fingerprint="{fingerprint}" build_id="UP1A" />
  <Summary pass="1" failed="1" modules_done="1" modules_total="1" />
  <Module name="{module}" abi="arm64-v8a" runtime="10" done="true" pass="1" total_tests="2">
    <TestCase name="Case">
      <Test result="pass" name="testPass" />
      <Test result="fail" name="testFail"><Failure message="boom"><StackTrace>at X</StackTrace></Failure></Test>
    </TestCase>
  </Module>
</Result>
"#
    );
    let path = dir.join(name);
    fs::write(&path, xml).expect("failed to write shard");
    path
}

/// Config that skips the zip and HTML artifacts.
fn write_config(dir: &TempDir) -> PathBuf {
    let path = dir.join("config.yml");
    fs::write(
        &path,
        "parse:\n  timeout_secs: 60\n  jobs: 2\noutput:\n  create_zip: false\n  create_html: false\n",
    )
    .expect("failed to write config");
    path
}

fn path_str(path: &PathBuf) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

#[test]
fn test_merge_xml_writes_result_directory() {
    let dir = TempDir::new("merge_xml");
    let a = write_shard(&dir, "a.xml", FP, "CtsA");
    let b = write_shard(&dir, "b.xml", FP, "CtsB");
    let record = dir.join("record.pb");
    fs::write(&record, [1u8, 2, 3]).unwrap();
    let out = dir.join("results");

    let output = run(&[
        "merge-xml",
        path_str(&a),
        path_str(&b),
        "--output",
        path_str(&out),
        "--test-record",
        path_str(&record),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("test_result.xml"));
    assert!(out.join("checksum-suite.json").is_file());
    assert!(out.join("proto/test-record.pb").is_file());
    assert!(out.join("test_result.html").is_file());
    assert!(dir.join("results.zip").is_file());

    let xml = fs::read_to_string(out.join("test_result.xml")).unwrap();
    assert!(xml.contains(r#"<Summary pass="2" failed="2" modules_done="2" modules_total="2"/>"#));
    assert!(xml.contains(r#"devices="a.xml,b.xml""#));
    assert!(!xml.contains("command_line_args"));
}

#[test]
fn test_merge_xml_with_config_skips_optional_artifacts() {
    let dir = TempDir::new("merge_xml_config");
    let a = write_shard(&dir, "a.xml", FP, "CtsA");
    let config = write_config(&dir);
    let out = dir.join("results");

    let output = run(&[
        "merge-xml",
        path_str(&a),
        "--output",
        path_str(&out),
        "--config",
        path_str(&config),
    ]);
    assert!(output.status.success());
    assert!(out.join("test_result.xml").is_file());
    assert!(!out.join("test_result.html").exists());
    assert!(!dir.join("results.zip").exists());
}

#[test]
fn test_merge_xml_mixed_builds_exits_with_two() {
    let dir = TempDir::new("mixed_builds");
    let a = write_shard(&dir, "a.xml", FP, "CtsA");
    let b = write_shard(&dir, "b.xml", "other/build", "CtsB");
    let out = dir.join("results");

    let output = run(&["merge-xml", path_str(&a), path_str(&b), "--output", path_str(&out)]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!out.join("test_result.xml").exists());
}

#[test]
fn test_merge_xml_malformed_input_exits_with_one() {
    let dir = TempDir::new("malformed");
    let bad = dir.join("bad.xml");
    fs::write(&bad, "<Result><Module></Result>").unwrap();

    let output = run(&["merge-xml", path_str(&bad), "--output", path_str(&dir.join("out"))]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse_reports_invalid_input"), "stderr: {stderr}");
}

#[test]
fn test_invalid_config_exits_with_one() {
    let dir = TempDir::new("bad_config");
    let a = write_shard(&dir, "a.xml", FP, "CtsA");
    let config = dir.join("config.yml");
    fs::write(&config, "parse:\n  jobs: 0\n").unwrap();

    let output = run(&[
        "merge-xml",
        path_str(&a),
        "--output",
        path_str(&dir.join("out")),
        "--config",
        path_str(&config),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("config_invalid"));
}

#[test]
fn test_merge_mobly_from_manifest() {
    let dir = TempDir::new("merge_mobly");
    fs::create_dir_all(dir.join("pkg")).unwrap();
    fs::write(
        dir.join("pkg/test_summary.yaml"),
        "Type: Record\nTest Class: WifiTest\nTest Name: test_connect\nResult: PASS\n\
         Begin Time: 1000\nEnd Time: 1500\n---\n\
         Type: Summary\nRequested: 1\nExecuted: 1\nPassed: 1\nFailed: 0\n",
    )
    .unwrap();
    let manifest = dir.join("manifest.yml");
    fs::write(
        &manifest,
        format!(
            "- package_name: wifi\n  module_abi: arm64-v8a\n  summary_file: pkg/test_summary.yaml\n  device_build_fingerprint: \"{FP}\"\n"
        ),
    )
    .unwrap();
    let out = dir.join("results");
    let config = write_config(&dir);

    let output = run(&[
        "merge-mobly",
        "--manifest",
        path_str(&manifest),
        "--output",
        path_str(&out),
        "--config",
        path_str(&config),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let xml = fs::read_to_string(out.join("test_result.xml")).unwrap();
    assert!(xml.contains(r#"<Module name="wifi" abi="arm64-v8a" runtime="500""#));
    assert!(xml.contains(r#"<Test result="pass" name="test_connect"/>"#));
}

#[test]
fn test_merge_mobly_missing_summaries_exits_with_two() {
    let dir = TempDir::new("mobly_missing");
    let manifest = dir.join("manifest.yml");
    fs::write(
        &manifest,
        "- package_name: gone\n  summary_file: nowhere/test_summary.yaml\n  device_build_fingerprint: fp\n",
    )
    .unwrap();

    let output = run(&[
        "merge-mobly",
        "--manifest",
        path_str(&manifest),
        "--output",
        path_str(&dir.join("out")),
    ]);
    assert_eq!(output.status.code(), Some(2));
}
