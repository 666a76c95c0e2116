use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use xts_report_core::Report;
use xts_report_creator::{CreatedReport, ReportConfig, ReportCreator};
use xts_report_parser::{
    MoblyReportInfo, ParseOrchestrator, ReportMerger, build_thread_pool, default_parallel_jobs,
};

/// Exit code when the inputs did not produce a mergeable report.
const EXIT_NOTHING_TO_MERGE: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "xts-report")]
#[command(about = "Merge xTS test result shards into one canonical report", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge test_result.xml files of one device build.
    MergeXml(MergeXmlArgs),
    /// Merge Mobly test_summary.yaml results listed in a manifest.
    MergeMobly(MergeMoblyArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Result directory to write test_result.xml and its artifacts into.
    #[arg(long)]
    output: PathBuf,
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Parse worker threads (overrides the configuration).
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Debug, Args)]
struct MergeXmlArgs {
    /// Report files to merge.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Serialized test record copied to proto/test-record.pb.
    #[arg(long)]
    test_record: Option<PathBuf>,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Args)]
struct MergeMoblyArgs {
    /// YAML list of Mobly result entries. Relative paths are resolved
    /// against the manifest's directory.
    #[arg(long)]
    manifest: PathBuf,
    #[command(flatten)]
    common: CommonArgs,
}

/// Result of a merge command that did not fail.
enum Outcome {
    Created(CreatedReport),
    NothingToMerge,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::MergeXml(args) => run_merge_xml(args),
        Command::MergeMobly(args) => run_merge_mobly(args),
    };

    match result {
        Ok(Outcome::Created(created)) => print_created(&created),
        Ok(Outcome::NothingToMerge) => {
            eprintln!("error: no mergeable report (no usable input, or inputs from different builds)");
            std::process::exit(EXIT_NOTHING_TO_MERGE);
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run_merge_xml(args: MergeXmlArgs) -> Result<Outcome, String> {
    let config = load_config(args.common.config.as_deref())?;
    let test_record = args
        .test_record
        .as_deref()
        .map(|path| {
            fs::read(path)
                .map_err(|err| format!("Failed to read test record '{}': {err}", path.display()))
        })
        .transpose()?;

    let merger = build_merger(&config, args.common.jobs, args.inputs.len())?;
    let merged = merger
        .merge_xml_reports(args.inputs)
        .map_err(|err| format!("[{}] {err}", err.error_id()))?;
    finish(merged, &config, &args.common.output, test_record.as_deref())
}

fn run_merge_mobly(args: MergeMoblyArgs) -> Result<Outcome, String> {
    let config = load_config(args.common.config.as_deref())?;
    let infos = load_mobly_manifest(&args.manifest)?;

    let merger = build_merger(&config, args.common.jobs, infos.len())?;
    let merged = merger
        .merge_mobly_reports(infos)
        .map_err(|err| format!("[{}] {err}", err.error_id()))?;
    finish(merged, &config, &args.common.output, None)
}

fn load_config(path: Option<&Path>) -> Result<ReportConfig, String> {
    let Some(path) = path else {
        return Ok(ReportConfig::default());
    };
    let config = ReportConfig::load(path).map_err(|err| {
        format!(
            "[{}] Failed to load config '{}': {err}",
            err.error_id(),
            path.display()
        )
    })?;
    debug!(path = %path.display(), ?config, "loaded configuration");
    Ok(config)
}

fn build_merger(
    config: &ReportConfig,
    jobs: Option<usize>,
    input_count: usize,
) -> Result<ReportMerger, String> {
    let jobs = jobs
        .or(config.parse.jobs)
        .unwrap_or_else(|| default_parallel_jobs(input_count));
    if jobs == 0 {
        return Err("--jobs must be greater than zero".to_string());
    }
    let pool = build_thread_pool(jobs).map_err(|err| format!("[{}] {err}", err.error_id()))?;
    Ok(ReportMerger::new(ParseOrchestrator::new(
        pool,
        config.parse.timeout(),
    )))
}

fn load_mobly_manifest(path: &Path) -> Result<Vec<MoblyReportInfo>, String> {
    let file = File::open(path)
        .map_err(|err| format!("Failed to open manifest '{}': {err}", path.display()))?;
    let mut infos: Vec<MoblyReportInfo> = serde_yaml::from_reader(BufReader::new(file))
        .map_err(|err| format!("Failed to parse manifest '{}': {err}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for info in &mut infos {
        info.summary_file = base.join(&info.summary_file);
        if let Some(file) = info.result_attributes_file.as_mut() {
            *file = base.join(&*file);
        }
        if let Some(file) = info.build_attributes_file.as_mut() {
            *file = base.join(&*file);
        }
    }
    Ok(infos)
}

fn finish(
    merged: Option<Report>,
    config: &ReportConfig,
    output: &Path,
    test_record: Option<&[u8]>,
) -> Result<Outcome, String> {
    let Some(report) = merged else {
        return Ok(Outcome::NothingToMerge);
    };
    info!(
        modules = report.modules.len(),
        passed = report.summary.passed,
        failed = report.summary.failed,
        "merged report"
    );

    let created = ReportCreator::new(config.output.clone())
        .create_report(&report, output, test_record)
        .map_err(|err| format!("[{}] {err}", err.error_id()))?;
    Ok(Outcome::Created(created))
}

fn print_created(created: &CreatedReport) {
    println!("{}", created.xml.display());
    for path in [
        &created.checksum,
        &created.test_record,
        &created.zip,
        &created.html,
    ]
    .into_iter()
    .flatten()
    {
        println!("{}", path.display());
    }
}
