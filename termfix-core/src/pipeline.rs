//! The fix orchestrator, extracted from the CLI.
//!
//! `run_fix` is I/O-agnostic: server calls go through [`TerminologyClient`] and report rows
//! through [`ReportSink`].

use crate::ports::{ReportSink, TerminologyClient, WritePort};
use crate::settings::RunSettings;
use anyhow::Context;
use camino::Utf8Path;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use termfix_domain::{
    ComponentSelector, FixContext, SelectionRule, TaskBatcher, find_fixer, verify_batch,
};
use termfix_edit::{EditError, EditOptions, EditPipeline, TaskAborted, TaskResult};
use termfix_render::render_run_md;
use termfix_snapshot::Snapshot;
use termfix_types::{Batch, ConceptId, RunReport, RunSummary, Task};
use tracing::{debug, info, warn};

/// Error type for run results. Exit code 1 for both variants.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    IllegalState(#[from] EditError),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::IllegalState(e) => e.exit_code(),
            ToolError::Internal(_) => 1,
        }
    }
}

/// Cooperative cancellation, checked before each task starts.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of `run_fix`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    pub batch: Batch,
}

impl RunOutcome {
    /// 2 when any concept ended invalid or fatal, else 0.
    pub fn exit_code(&self) -> u8 {
        if self.report.summary.needs_attention() {
            2
        } else {
            0
        }
    }
}

/// Select candidates, batch them into tasks and edit every task.
///
/// Rows are written to `sink` as each task finishes. An illegal state stops all tasks not yet
/// started and is returned as [`ToolError::IllegalState`].
pub fn run_fix(
    settings: &RunSettings,
    snapshot: &Snapshot,
    rule: &SelectionRule,
    client: &dyn TerminologyClient,
    sink: &dyn ReportSink,
    stop: &StopHandle,
) -> Result<RunOutcome, ToolError> {
    let fixer = find_fixer(&settings.fix_key)
        .with_context(|| format!("unknown fix key '{}'", settings.fix_key))?;
    let ctx = FixContext::new(snapshot, &settings.params);
    fixer
        .check_params(&ctx)
        .with_context(|| format!("parameters for {}", settings.fix_key))?;

    let candidates = ComponentSelector::new(snapshot)
        .include_inactive(settings.include_inactive)
        .select_for(rule, fixer.as_ref(), &ctx)
        .context("select candidates")?;
    let deps = fixer.dependencies(&ctx, &candidates);
    let ids: Vec<ConceptId> = candidates.iter().map(|c| c.id).collect();
    info!(fix = %settings.fix_key, candidates = ids.len(), dependencies = deps.len(), "selected");

    let batcher = TaskBatcher::new(settings.max_task_size, &settings.project_branch)
        .context("configure batcher")?
        .with_task_prefix(&settings.task_prefix);
    let batch = if settings.group_by_key {
        let keyed: Vec<(ConceptId, String)> = candidates
            .iter()
            .map(|c| (c.id, fixer.group_key(&ctx, c).unwrap_or_default()))
            .collect();
        batcher.batch_by_key(&keyed, &deps)
    } else {
        batcher.batch(&ids, &deps)
    }
    .context("batch candidates")?;
    verify_batch(&batch, &ids, &deps).context("verify batch")?;

    let mut report = RunReport::new(&settings.fix_key, &settings.project_branch, settings.dry_run);
    report.tasks = batch.iter().map(|t| t.id.clone()).collect();

    let mut summary = RunSummary::default();
    let start = settings.restart_from_task.unwrap_or(0);
    let pending: Vec<&Task> = batch
        .iter()
        .filter(|t| {
            let keep = t.index >= start;
            if !keep {
                debug!(task = %t.id, index = t.index, "before restart position; skipped");
            }
            keep
        })
        .collect();
    summary.skipped_tasks += (batch.len() - pending.len()) as u64;

    let pipeline = EditPipeline::new(
        client,
        fixer.as_ref(),
        &ctx,
        EditOptions {
            dry_run: settings.dry_run,
            report_no_change: settings.report_no_change,
        },
    );
    let abort = AtomicBool::new(false);

    if settings.workers <= 1 {
        summary.merge(&run_tasks(&pipeline, &pending, sink, stop, &abort)?);
    } else {
        // One group per branch: at most one save in flight per branch.
        let mut by_branch: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
        for t in pending.iter().copied() {
            by_branch.entry(t.branch.as_str()).or_default().push(t);
        }
        let groups: Vec<Vec<&Task>> = by_branch.into_values().collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers)
            .build()
            .context("build worker pool")?;
        debug!(workers = settings.workers, groups = groups.len(), "running tasks in parallel");
        let results: Vec<Result<RunSummary, ToolError>> = pool.install(|| {
            groups
                .par_iter()
                .map(|tasks| run_tasks(&pipeline, tasks, sink, stop, &abort))
                .collect()
        });
        for r in results {
            summary.merge(&r?);
        }
    }

    sink.flush().context("flush report")?;
    report.finish(summary);
    info!(
        fix = %settings.fix_key,
        status = ?report.status,
        tasks = report.summary.tasks,
        changed = report.summary.changed,
        fatal = report.summary.fatal_errors,
        "run finished"
    );
    Ok(RunOutcome { report, batch })
}

fn run_tasks(
    pipeline: &EditPipeline<'_>,
    tasks: &[&Task],
    sink: &dyn ReportSink,
    stop: &StopHandle,
    abort: &AtomicBool,
) -> Result<RunSummary, ToolError> {
    let mut summary = RunSummary::default();
    for task in tasks {
        if stop.is_stopped() || abort.load(Ordering::SeqCst) {
            debug!(task = %task.id, "stopped before start");
            summary.skipped_tasks += 1;
            continue;
        }
        match pipeline.process_task(task) {
            Ok(result) => {
                record_rows(sink, task, &result)?;
                summary.merge(&result.summary);
            }
            Err(TaskAborted { partial, error }) => {
                warn!(task = %task.id, concept = %error.concept(), error = %error, "aborting run");
                abort.store(true, Ordering::SeqCst);
                // Concepts saved before the failure are still reported.
                record_rows(sink, task, &partial)?;
                sink.flush().context("flush report")?;
                return Err(error.into());
            }
        }
    }
    Ok(summary)
}

fn record_rows(sink: &dyn ReportSink, task: &Task, result: &TaskResult) -> anyhow::Result<()> {
    for row in result.rows() {
        sink.record(row)
            .with_context(|| format!("record row for task {}", task.id))?;
    }
    Ok(())
}

/// Write `summary.json`, `summary.md` and `batch.json` to `out_dir`.
pub fn write_run_artifacts(
    outcome: &RunOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let summary_json =
        serde_json::to_string_pretty(&outcome.report).context("serialize summary")?;
    writer.write_file(&out_dir.join("summary.json"), summary_json.as_bytes())?;
    writer.write_file(
        &out_dir.join("summary.md"),
        render_run_md(&outcome.report, &outcome.batch).as_bytes(),
    )?;

    let batch_json = serde_json::to_string_pretty(&outcome.batch).context("serialize batch")?;
    writer.write_file(&out_dir.join("batch.json"), batch_json.as_bytes())?;
    Ok(())
}
