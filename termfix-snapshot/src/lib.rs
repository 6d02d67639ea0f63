//! Read-only view of the ontology used for selection and subsumption.
//!
//! A [`Snapshot`] is built once from a bulk load and never mutated afterwards; a reload builds a
//! new one. Each snapshot owns one [`ClosureCache`] per characteristic type.

mod closure;
mod error;
mod load;
mod query;
mod snapshot;

pub use closure::ClosureCache;
pub use error::{QueryError, SnapshotError};
pub use load::load_snapshot;
pub use query::{Constraint, HierarchyQuery, SetOp};
pub use snapshot::Snapshot;
