//! Error types for termfix-edit.
//!
//! Only [`EditError`] leaves the pipeline. Client failures, fixer refusals and invariant
//! violations are recorded as per-concept outcomes instead.

use termfix_types::ConceptId;
use thiserror::Error;

/// Failure reported by a terminology server client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("concept {id} not found on branch {branch}")]
    NotFound { id: ConceptId, branch: String },

    #[error("server rejected the request: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Unrecoverable pipeline error. Aborts the enclosing task and the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("illegal state at concept {concept}: {message}")]
    IllegalState { concept: ConceptId, message: String },
}

impl EditError {
    pub fn concept(&self) -> ConceptId {
        match self {
            EditError::IllegalState { concept, .. } => *concept,
        }
    }

    /// Recommended process exit code.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

pub type EditResult<T> = Result<T, EditError>;
