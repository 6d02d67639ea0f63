use termfix_snapshot::{QueryError, SnapshotError};
use termfix_types::ConceptId;
use thiserror::Error;

/// Failure raised by a fixer while mutating a loaded concept.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixError {
    /// The concept cannot be fixed as asked; reported like a validation failure.
    #[error("{0}")]
    Invalid(String),

    /// A precondition the engine relies on does not hold. Aborts the run.
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl From<SnapshotError> for FixError {
    fn from(e: SnapshotError) -> Self {
        FixError::IllegalState(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("query: {0}")]
    Query(#[from] QueryError),

    #[error("pre-filter for {concept}: {source}")]
    Prefilter {
        concept: ConceptId,
        #[source]
        source: FixError,
    },
}

/// Batch construction or verification failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("max task size must be at least 1")]
    InvalidMaxSize,

    #[error("concept {0} is not covered by any task")]
    Missing(ConceptId),

    #[error("concept {0} appears more than once in the batch")]
    Duplicated(ConceptId),

    #[error("concept {0} is in the batch but was not a candidate")]
    Unexpected(ConceptId),

    #[error("task {0} is empty")]
    EmptyTask(usize),

    #[error("{after} must share a task with {before} and follow it")]
    Dependency { before: ConceptId, after: ConceptId },
}
