use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of running one concept through the edit pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum EditOutcome {
    /// Saved (or would have been, in dry-run) with this many changes.
    Changed(usize),
    NoChange,
    /// A domain rule was violated; nothing was saved.
    Invalid(String),
    /// The server refused the load or save.
    Fatal(String),
}

impl EditOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, EditOutcome::Changed(_))
    }

    pub fn change_count(&self) -> usize {
        match self {
            EditOutcome::Changed(n) => *n,
            _ => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EditOutcome::Changed(_) => "changed",
            EditOutcome::NoChange => "no_change",
            EditOutcome::Invalid(_) => "invalid",
            EditOutcome::Fatal(_) => "fatal",
        }
    }
}

impl fmt::Display for EditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOutcome::Changed(n) => write!(f, "changed ({})", n),
            EditOutcome::NoChange => write!(f, "no change"),
            EditOutcome::Invalid(reason) => write!(f, "invalid: {}", reason),
            EditOutcome::Fatal(err) => write!(f, "fatal: {}", err),
        }
    }
}
