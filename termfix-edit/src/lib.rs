//! Edit engine for termfix tasks.
//!
//! Responsibilities:
//! - Re-fetch each concept on the task branch and hand it to a fixer.
//! - Check the mutated copy against the concept invariants.
//! - Save (or, in dry-run, only report) and turn every failure but one into an [`EditOutcome`].
//!
//! [`EditOutcome`]: termfix_types::EditOutcome

mod error;
mod pipeline;
mod ports;
mod validate;

pub use error::{ClientError, EditError, EditResult};
pub use pipeline::{
    ConceptResult, EditOptions, EditPipeline, EditState, TaskAborted, TaskResult,
};
pub use ports::TerminologyClient;
pub use validate::{removed_components, validate_mutation};
