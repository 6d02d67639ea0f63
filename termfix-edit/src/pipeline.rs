use crate::error::{EditError, EditResult};
use crate::ports::TerminologyClient;
use crate::validate::{removed_components, validate_mutation};
use termfix_domain::{FixContext, FixError, Fixer};
use termfix_types::{
    ActionType, ConceptId, EditOutcome, ReportRow, RunSummary, Severity, Task,
};
use tracing::{debug, info, trace, warn};

/// Per-concept states. Terminal states are `Saved`, `NoChange`, `ValidationFailed` and
/// `FatalError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Selected,
    Loaded,
    Mutated,
    Validated,
    Saved,
    NoChange,
    ValidationFailed,
    FatalError,
}

#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    /// Report outcomes as if saved, but make no server writes.
    pub dry_run: bool,
    /// Emit a `NO_CHANGE` row for concepts that needed nothing.
    pub report_no_change: bool,
}

/// What happened to one concept and the rows to report for it.
#[derive(Debug, Clone)]
pub struct ConceptResult {
    pub concept: ConceptId,
    pub state: EditState,
    pub outcome: EditOutcome,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskResult {
    pub concepts: Vec<ConceptResult>,
    pub summary: RunSummary,
}

impl TaskResult {
    pub fn rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.concepts.iter().flat_map(|c| c.rows.iter())
    }

    fn push(&mut self, r: ConceptResult) {
        self.summary.record(&r.outcome);
        self.concepts.push(r);
    }
}

/// A task cut short by an [`EditError`]. `partial` holds every concept finished before the
/// failing one; their saves stay on the server.
#[derive(Debug, Clone)]
pub struct TaskAborted {
    pub partial: TaskResult,
    pub error: EditError,
}

/// Drives the load, mutate, validate, save cycle for one fixer.
pub struct EditPipeline<'a> {
    client: &'a dyn TerminologyClient,
    fixer: &'a dyn Fixer,
    ctx: &'a FixContext<'a>,
    options: EditOptions,
}

impl<'a> EditPipeline<'a> {
    pub fn new(
        client: &'a dyn TerminologyClient,
        fixer: &'a dyn Fixer,
        ctx: &'a FixContext<'a>,
        options: EditOptions,
    ) -> Self {
        Self {
            client,
            fixer,
            ctx,
            options,
        }
    }

    pub fn options(&self) -> &EditOptions {
        &self.options
    }

    /// Run every concept of a task in order. Stops only on [`EditError`], handing back the
    /// results gathered so far.
    pub fn process_task(&self, task: &Task) -> Result<TaskResult, TaskAborted> {
        info!(task = %task.id, index = task.index, branch = %task.branch, concepts = task.len(), "task started");
        let mut result = TaskResult::default();
        result.summary.tasks = 1;
        for &id in &task.concepts {
            match self.process_concept(task, id) {
                Ok(r) => result.push(r),
                Err(error) => {
                    warn!(task = %task.id, concept = %id, done = result.concepts.len(), "task aborted");
                    return Err(TaskAborted {
                        partial: result,
                        error,
                    });
                }
            }
        }
        info!(
            task = %task.id,
            changed = result.summary.changed,
            no_change = result.summary.no_change,
            invalid = result.summary.validation_failures,
            fatal = result.summary.fatal_errors,
            "task finished"
        );
        Ok(result)
    }

    pub fn process_concept(&self, task: &Task, id: ConceptId) -> EditResult<ConceptResult> {
        let fix_key = self.fixer.meta().fix_key;
        let mut state = EditState::Selected;
        trace!(task = %task.id, concept = %id, ?state, "begin");

        let loaded = match self.client.load_concept(id, &task.branch) {
            Ok(c) => c,
            Err(e) => {
                warn!(task = %task.id, concept = %id, error = %e, "load failed");
                let reason = format!("load failed: {}", e);
                return Ok(ConceptResult {
                    concept: id,
                    state: EditState::FatalError,
                    rows: vec![ReportRow::new(
                        &task.id,
                        id,
                        Severity::Critical,
                        ActionType::ApiError,
                        reason.clone(),
                    )],
                    outcome: EditOutcome::Fatal(reason),
                });
            }
        };
        state = transition(task, id, state, EditState::Loaded);
        let fsn = loaded.fsn.clone();
        let row = |severity, action, detail: String| {
            ReportRow::new(&task.id, id, severity, action, detail).with_fsn(&fsn)
        };

        let mutation = match self.fixer.apply(self.ctx, loaded.clone()) {
            Ok(m) => m,
            Err(FixError::Invalid(reason)) => {
                transition(task, id, state, EditState::ValidationFailed);
                return Ok(ConceptResult {
                    concept: id,
                    state: EditState::ValidationFailed,
                    rows: vec![row(Severity::High, ActionType::ValidationCheck, reason.clone())],
                    outcome: EditOutcome::Invalid(reason),
                });
            }
            Err(FixError::IllegalState(message)) => {
                return Err(EditError::IllegalState {
                    concept: id,
                    message,
                });
            }
        };
        state = transition(task, id, state, EditState::Mutated);

        let count = mutation.change_count();
        if count == 0 {
            transition(task, id, state, EditState::NoChange);
            let mut rows = vec![];
            if self.options.report_no_change {
                rows.push(row(
                    Severity::None,
                    ActionType::NoChange,
                    format!("{}: nothing to change", fix_key),
                ));
            }
            return Ok(ConceptResult {
                concept: id,
                state: EditState::NoChange,
                outcome: EditOutcome::NoChange,
                rows,
            });
        }

        if let Err(reason) = validate_mutation(&loaded, &mutation.concept) {
            debug!(task = %task.id, concept = %id, %reason, "validation failed");
            transition(task, id, state, EditState::ValidationFailed);
            return Ok(ConceptResult {
                concept: id,
                state: EditState::ValidationFailed,
                rows: vec![row(Severity::High, ActionType::ValidationCheck, reason.clone())],
                outcome: EditOutcome::Invalid(reason),
            });
        }
        state = transition(task, id, state, EditState::Validated);

        if !self.options.dry_run {
            for component in removed_components(&loaded, &mutation.concept) {
                if let Err(e) = self.client.delete_component(&component, &task.branch) {
                    return Ok(self.save_failed(task, id, &fsn, format!("delete {}: {}", component, e)));
                }
            }
            if let Err(e) = self.client.update_concept(&mutation.concept, &task.branch) {
                return Ok(self.save_failed(task, id, &fsn, format!("update: {}", e)));
            }
        }
        transition(task, id, state, EditState::Saved);

        let mut rows: Vec<ReportRow> = mutation
            .changes
            .into_iter()
            .map(|note| row(Severity::Low, note.action, note.detail))
            .collect();
        let summary = if self.options.dry_run {
            format!("{}: {} change(s) (dry run, not saved)", fix_key, count)
        } else {
            format!("{}: {} change(s)", fix_key, count)
        };
        rows.push(row(Severity::Medium, ActionType::ConceptChangeMade, summary));

        Ok(ConceptResult {
            concept: id,
            state: EditState::Saved,
            outcome: EditOutcome::Changed(count),
            rows,
        })
    }

    fn save_failed(&self, task: &Task, id: ConceptId, fsn: &str, reason: String) -> ConceptResult {
        warn!(task = %task.id, concept = %id, %reason, "save failed");
        ConceptResult {
            concept: id,
            state: EditState::FatalError,
            rows: vec![
                ReportRow::new(&task.id, id, Severity::Critical, ActionType::ApiError, reason.clone())
                    .with_fsn(fsn),
            ],
            outcome: EditOutcome::Fatal(reason),
        }
    }
}

fn transition(task: &Task, id: ConceptId, from: EditState, to: EditState) -> EditState {
    trace!(task = %task.id, concept = %id, ?from, ?to, "transition");
    to
}
