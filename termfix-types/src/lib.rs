//! Shared DTOs (schemas-as-code) for the termfix workspace.
//!
//! # Design constraints
//! - Concepts are serialized to and from the terminology server and snapshot files.
//! - Report rows are an append-only stream; keep the action taxonomy closed.
//! - Prefer adding optional fields over changing semantics.

pub mod concept;
pub mod outcome;
pub mod report;
pub mod task;

pub use concept::{
    Acceptability, CharacteristicType, Concept, ConceptId, DefinitionStatus, Description,
    DescriptionType, Relationship, RelationshipGroup, RelationshipTarget,
};
pub use outcome::EditOutcome;
pub use report::{ActionType, ReportRow, RunReport, RunStatus, RunSummary, Severity};
pub use task::{Batch, Task};

/// Schema identifiers.
pub mod schema {
    pub const TERMFIX_REPORT_ROW_V1: &str = "termfix.report_row.v1";
    pub const TERMFIX_RUN_V1: &str = "termfix.run.v1";
}

/// Well-known concept ids.
pub mod ids {
    use crate::ConceptId;

    /// `116680003 |Is a (attribute)|`
    pub const IS_A: ConceptId = ConceptId(116_680_003);

    /// `138875005 |SNOMED CT Concept (SNOMED RT+CTV3)|`
    pub const ROOT: ConceptId = ConceptId(138_875_005);
}
