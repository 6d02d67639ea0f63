use crate::concept::ConceptId;
use crate::outcome::EditOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// Closed taxonomy of report actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    ConceptChangeMade,
    ConceptInactivated,
    RelationshipAdded,
    RelationshipInactivated,
    RelationshipDeleted,
    DescriptionAdded,
    DescriptionInactivated,
    DescriptionChangeMade,
    ValidationCheck,
    NoChange,
    ApiError,
    Info,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::ConceptChangeMade => "CONCEPT_CHANGE_MADE",
            ActionType::ConceptInactivated => "CONCEPT_INACTIVATED",
            ActionType::RelationshipAdded => "RELATIONSHIP_ADDED",
            ActionType::RelationshipInactivated => "RELATIONSHIP_INACTIVATED",
            ActionType::RelationshipDeleted => "RELATIONSHIP_DELETED",
            ActionType::DescriptionAdded => "DESCRIPTION_ADDED",
            ActionType::DescriptionInactivated => "DESCRIPTION_INACTIVATED",
            ActionType::DescriptionChangeMade => "DESCRIPTION_CHANGE_MADE",
            ActionType::ValidationCheck => "VALIDATION_CHECK",
            ActionType::NoChange => "NO_CHANGE",
            ActionType::ApiError => "API_ERROR",
            ActionType::Info => "INFO",
        }
    }
}

/// One concept-level line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub task_id: String,
    pub concept_id: ConceptId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsn: Option<String>,

    pub severity: Severity,
    pub action: ActionType,

    #[serde(default)]
    pub detail: String,
}

impl ReportRow {
    pub fn new(
        task_id: impl Into<String>,
        concept_id: ConceptId,
        severity: Severity,
        action: ActionType,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            concept_id,
            fsn: None,
            severity,
            action,
            detail: detail.into(),
        }
    }

    pub fn with_fsn(mut self, fsn: impl Into<String>) -> Self {
        self.fsn = Some(fsn.into());
        self
    }
}

/// End-of-run counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tasks: u64,

    /// Tasks not started because of cancellation or a restart position.
    #[serde(default)]
    pub skipped_tasks: u64,

    pub concepts: u64,
    pub changed: u64,
    pub no_change: u64,
    pub validation_failures: u64,
    pub fatal_errors: u64,

    /// Sum of change counts over changed concepts.
    #[serde(default)]
    pub changes: u64,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &EditOutcome) {
        self.concepts += 1;
        match outcome {
            EditOutcome::Changed(n) => {
                self.changed += 1;
                self.changes += *n as u64;
            }
            EditOutcome::NoChange => self.no_change += 1,
            EditOutcome::Invalid(_) => self.validation_failures += 1,
            EditOutcome::Fatal(_) => self.fatal_errors += 1,
        }
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.tasks += other.tasks;
        self.skipped_tasks += other.skipped_tasks;
        self.concepts += other.concepts;
        self.changed += other.changed;
        self.no_change += other.no_change;
        self.validation_failures += other.validation_failures;
        self.fatal_errors += other.fatal_errors;
        self.changes += other.changes;
    }

    pub fn needs_attention(&self) -> bool {
        self.validation_failures > 0 || self.fatal_errors > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pass,
    Warn,
    Fail,
}

/// Serialized end-of-run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema: String,
    pub fix_key: String,
    pub branch: String,
    pub dry_run: bool,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub summary: RunSummary,

    /// Ids of tasks in batch order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<String>,
}

impl RunReport {
    pub fn new(fix_key: impl Into<String>, branch: impl Into<String>, dry_run: bool) -> Self {
        Self {
            schema: crate::schema::TERMFIX_RUN_V1.to_string(),
            fix_key: fix_key.into(),
            branch: branch.into(),
            dry_run,
            status: RunStatus::Pass,
            started_at: Utc::now(),
            ended_at: None,
            summary: RunSummary::default(),
            tasks: vec![],
        }
    }

    /// Fail on fatal errors, warn on validation failures, pass otherwise.
    pub fn finish(&mut self, summary: RunSummary) {
        self.status = if summary.fatal_errors > 0 {
            RunStatus::Fail
        } else if summary.validation_failures > 0 {
            RunStatus::Warn
        } else {
            RunStatus::Pass
        };
        self.summary = summary;
        self.ended_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_records_each_outcome_kind() {
        let mut s = RunSummary::default();
        s.record(&EditOutcome::Changed(3));
        s.record(&EditOutcome::NoChange);
        s.record(&EditOutcome::Invalid("orphan".into()));
        s.record(&EditOutcome::Fatal("500".into()));

        assert_eq!(s.concepts, 4);
        assert_eq!(s.changed, 1);
        assert_eq!(s.changes, 3);
        assert_eq!(s.no_change, 1);
        assert_eq!(s.validation_failures, 1);
        assert_eq!(s.fatal_errors, 1);
        assert!(s.needs_attention());
    }

    #[test]
    fn finish_sets_status_from_counts() {
        let mut report = RunReport::new("fix", "MAIN", true);
        report.finish(RunSummary {
            validation_failures: 1,
            ..Default::default()
        });
        assert_eq!(report.status, RunStatus::Warn);

        report.finish(RunSummary {
            fatal_errors: 1,
            ..Default::default()
        });
        assert_eq!(report.status, RunStatus::Fail);

        report.finish(RunSummary::default());
        assert_eq!(report.status, RunStatus::Pass);
        assert!(report.ended_at.is_some());
    }
}
