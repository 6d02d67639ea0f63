use termfix_types::ConceptId;
use thiserror::Error;

/// Caller-precondition violations against a snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("unknown concept {0}")]
    UnknownConcept(ConceptId),

    #[error("duplicate concept {0} in snapshot")]
    DuplicateConcept(ConceptId),

    #[error("IS-A cycle through concept {0}")]
    Cycle(ConceptId),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty query")]
    Empty,

    #[error("unexpected token '{found}' at offset {offset}")]
    UnexpectedToken { offset: usize, found: String },

    #[error("unexpected end of query")]
    UnexpectedEnd,

    #[error("invalid concept id '{0}'")]
    InvalidId(String),

    #[error("unterminated |term| starting at offset {0}")]
    UnterminatedTerm(usize),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
