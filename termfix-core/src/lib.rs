//! Embeddable core library for termfix.
//!
//! Provides a clap-free, I/O-abstracted entry point that selects candidates, batches them into
//! tasks and drives every task through the edit pipeline.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`TerminologyClient`](ports::TerminologyClient): load, update and delete on the server
//! - [`ReportSink`](ports::ReportSink): append report rows
//! - [`WritePort`](ports::WritePort): write files and create directories
//!
//! The [`adapters`] module provides in-memory and file-backed implementations.
//!
//! # Entry points
//!
//! - [`run_fix`](pipeline::run_fix): select, batch and edit
//! - [`write_run_artifacts`](pipeline::write_run_artifacts): persist summary and batch

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

// Re-exports so embedders need only this crate.
pub use termfix_domain::{FixerMeta, Params, SelectionRule, builtin_fixer_metas};
pub use termfix_snapshot::{Snapshot, load_snapshot};
