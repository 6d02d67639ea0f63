mod config;
mod explain;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgGroup, Parser, Subcommand};
use config::{ConfigMerger, MergedConfig, RunOverrides};
use fs_err as fs;
use std::process::ExitCode;
use termfix_core::adapters::{FileTerminologyServer, FsWritePort, JsonLinesReportSink};
use termfix_core::pipeline::{StopHandle, run_fix, write_run_artifacts};
use termfix_core::settings::RunSettings;
use termfix_core::{SelectionRule, builtin_fixer_metas, load_snapshot};
use termfix_types::ConceptId;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "termfix",
    version,
    about = "Batch edits of concepts on a terminology server."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Select, batch and edit concepts with one fix (default: dry-run).
    Run(RunArgs),
    /// Explain what a fix does and which parameters it takes.
    Explain(ExplainArgs),
    /// List all available fixes.
    ListFixes(ListFixesArgs),
}

#[derive(Debug, Parser)]
#[command(group(ArgGroup::new("selection").required(true).args(["input", "query"])))]
struct RunArgs {
    /// Fix key (see `termfix list-fixes`).
    #[arg(long = "fix")]
    fix_key: String,

    /// Snapshot file: a JSON array of concepts, or JSON lines (.jsonl/.ndjson).
    #[arg(long)]
    snapshot: Utf8PathBuf,

    /// Server state file. Created from the snapshot if missing.
    #[arg(long)]
    server: Utf8PathBuf,

    /// Project branch; task branches are created beneath it.
    #[arg(long)]
    branch: Option<String>,

    /// File of concept ids, one per line (`#` starts a comment).
    #[arg(long)]
    input: Option<Utf8PathBuf>,

    /// Hierarchy query, e.g. "<< 404684003 MINUS << 64572001".
    #[arg(long)]
    query: Option<String>,

    /// Save changes to the server. If omitted, runs a dry-run and only emits reports.
    #[arg(long, default_value_t = false)]
    apply: bool,

    /// Soft maximum number of concepts per task.
    #[arg(long)]
    max_task_size: Option<usize>,

    /// Worker threads (1 = sequential).
    #[arg(long)]
    workers: Option<usize>,

    /// Prefix of task branch names.
    #[arg(long)]
    task_prefix: Option<String>,

    /// Fix parameter as key=value (repeatable).
    #[arg(long = "param")]
    params: Vec<String>,

    /// Co-locate candidates sharing the fixer's group key.
    #[arg(long, default_value_t = false)]
    group_by_key: bool,

    /// Report concepts that needed no change.
    #[arg(long, default_value_t = false)]
    report_no_change: bool,

    /// Skip tasks before this index (resume an interrupted run).
    #[arg(long)]
    restart_from_task: Option<usize>,

    /// Include inactive concepts in the selection.
    #[arg(long, default_value_t = false)]
    include_inactive: bool,

    /// Output directory for reports (default: termfix-out).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Config file (default: ./termfix.toml when present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct ExplainArgs {
    /// Fix key (e.g. "description.replace_term" or "replace_term").
    fix_key: String,
}

#[derive(Debug, Parser)]
struct ListFixesArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<u8> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Explain(args) => cmd_explain(args).map(|_| 0),
        Command::ListFixes(args) => cmd_list_fixes(args).map(|_| 0),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<u8> {
    let file_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::load_or_default(Utf8Path::new(".")).context("load termfix.toml config")?,
    };
    let library = RunSettings::default();
    let defaults = MergedConfig {
        branch: library.project_branch.clone(),
        task_prefix: library.task_prefix.clone(),
        max_task_size: library.max_task_size,
        workers: library.workers,
        report_no_change: library.report_no_change,
        group_by_key: library.group_by_key,
        params: library.params.clone(),
    };
    let merged = ConfigMerger::new(file_config).merge_run_args(
        RunOverrides {
            branch: args.branch,
            task_prefix: args.task_prefix,
            max_task_size: args.max_task_size,
            workers: args.workers,
            report_no_change: args.report_no_change,
            group_by_key: args.group_by_key,
            params: config::parse_cli_params(&args.params)?,
        },
        &defaults,
    );
    debug!(?merged, "merged config");

    let settings = RunSettings {
        fix_key: args.fix_key,
        project_branch: merged.branch,
        task_prefix: merged.task_prefix,
        dry_run: !args.apply,
        max_task_size: merged.max_task_size,
        workers: merged.workers,
        params: merged.params,
        group_by_key: merged.group_by_key,
        report_no_change: merged.report_no_change,
        include_inactive: args.include_inactive,
        restart_from_task: args.restart_from_task,
        out_dir: args.out_dir.unwrap_or(library.out_dir),
    };

    let snapshot = load_snapshot(&args.snapshot)?;
    let rule = match (args.input, args.query) {
        (Some(path), _) => SelectionRule::Explicit(read_id_file(&path)?),
        (None, Some(expr)) => SelectionRule::Query(expr),
        (None, None) => anyhow::bail!("one of --input or --query is required"),
    };

    let server = if args.server.exists() {
        FileTerminologyServer::open(&args.server)?
    } else {
        info!(path = %args.server, "seeding server file from snapshot");
        FileTerminologyServer::create(&args.server, &snapshot)?
    };

    fs::create_dir_all(&settings.out_dir)
        .with_context(|| format!("create {}", settings.out_dir))?;
    let sink = JsonLinesReportSink::create(settings.out_dir.join("report.jsonl"))?;

    let outcome = run_fix(&settings, &snapshot, &rule, &server, &sink, &StopHandle::new())?;
    write_run_artifacts(&outcome, &settings.out_dir, &FsWritePort)?;

    let s = &outcome.report.summary;
    println!(
        "{}: {} task(s), {} concept(s): {} changed, {} no change, {} invalid, {} fatal{}",
        settings.fix_key,
        s.tasks,
        s.concepts,
        s.changed,
        s.no_change,
        s.validation_failures,
        s.fatal_errors,
        if settings.dry_run { " (dry run)" } else { "" }
    );
    info!("wrote reports to {}", settings.out_dir);
    Ok(outcome.exit_code())
}

/// One id per line; blank lines and `#` comments are ignored.
fn read_id_file(path: &Utf8Path) -> anyhow::Result<Vec<ConceptId>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    let mut ids = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let id: u64 = line
            .parse()
            .with_context(|| format!("{}:{}: invalid concept id '{}'", path, n + 1, line))?;
        ids.push(ConceptId(id));
    }
    debug!(path = %path, ids = ids.len(), "read id file");
    Ok(ids)
}

fn cmd_explain(args: ExplainArgs) -> anyhow::Result<()> {
    use explain::{list_fix_keys, lookup_fix};

    let Some(fix) = lookup_fix(&args.fix_key) else {
        let available = list_fix_keys().join(", ");
        anyhow::bail!(
            "Unknown fix key: '{}'\n\nAvailable fixes: {}",
            args.fix_key,
            available
        );
    };

    println!("================================================================================");
    println!("FIX: {}", fix.title);
    println!("================================================================================");
    println!();
    println!("Key:  {}", fix.fix_key);
    println!();

    println!("DESCRIPTION");
    println!("--------------------------------------------------------------------------------");
    println!("{}", fix.description);
    println!();

    println!("PARAMETERS");
    println!("--------------------------------------------------------------------------------");
    if fix.params.is_empty() {
        println!("  (none)");
    }
    for (name, meaning) in fix.params {
        println!("  {:<10} {}", name, meaning);
    }
    println!();

    println!("ALREADY SATISFIED WHEN");
    println!("--------------------------------------------------------------------------------");
    println!("{}", fix.satisfied_when);
    println!();

    println!("BATCHING");
    println!("--------------------------------------------------------------------------------");
    println!("{}", fix.batching);
    println!();

    Ok(())
}

fn cmd_list_fixes(args: ListFixesArgs) -> anyhow::Result<()> {
    let metas = builtin_fixer_metas();
    match args.format {
        OutputFormat::Text => {
            println!("Available fixes:\n");
            println!("  {:<40} {:<24} DESCRIPTION", "KEY", "PARAMS");
            println!("  {:<40} {:<24} -----------", "---", "------");
            for m in &metas {
                println!(
                    "  {:<40} {:<24} {}",
                    m.fix_key,
                    m.params.join(","),
                    m.description
                );
            }
            println!();
            println!("Use 'termfix explain <key>' for details.");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&metas)?);
        }
    }
    Ok(())
}
