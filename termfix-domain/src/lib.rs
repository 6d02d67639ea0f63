//! Domain logic: decide *which* concepts need a fix, *how* they are grouped into tasks, and
//! *what* each fixer changes on a loaded concept.
//!
//! This crate does not talk to the terminology server; saving is the `termfix-edit` crate's job.

mod batcher;
mod error;
mod fixers;
mod selector;
mod subsumption;

pub use batcher::{TaskBatcher, task_branch, verify_batch};
pub use error::{BatchError, FixError, SelectError};
pub use fixers::{
    ChangeNote, FixContext, Fixer, FixerMeta, Mutation, Params, builtin_fixer_metas,
    builtin_fixers, find_fixer,
};
pub use selector::{ComponentSelector, SelectionRule};
pub use subsumption::{SubsumptionEngine, structural_signature};
