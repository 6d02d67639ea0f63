//! Port traits abstracting all I/O away from the orchestrator.

use camino::Utf8Path;
use termfix_types::ReportRow;

pub use termfix_edit::TerminologyClient;

/// Append-only destination for report rows. Shared across workers.
pub trait ReportSink: Send + Sync {
    fn record(&self, row: &ReportRow) -> anyhow::Result<()>;

    fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
