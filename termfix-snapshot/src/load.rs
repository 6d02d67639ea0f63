use crate::snapshot::Snapshot;
use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use termfix_types::Concept;
use tracing::debug;

/// Load a snapshot file.
///
/// `.jsonl` / `.ndjson` files hold one concept per line (blank lines skipped); anything else
/// is read as a JSON array of concepts.
pub fn load_snapshot(path: &Utf8Path) -> anyhow::Result<Snapshot> {
    let text = fs::read_to_string(path).with_context(|| format!("read snapshot {}", path))?;

    let concepts = match path.extension() {
        Some("jsonl") | Some("ndjson") => parse_lines(&text, path)?,
        _ => serde_json::from_str::<Vec<Concept>>(&text)
            .with_context(|| format!("parse snapshot {}", path))?,
    };
    debug!(path = %path, concepts = concepts.len(), "parsed snapshot file");

    Snapshot::from_concepts(concepts).with_context(|| format!("build snapshot from {}", path))
}

fn parse_lines(text: &str, path: &Utf8Path) -> anyhow::Result<Vec<Concept>> {
    let mut out = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let concept: Concept = serde_json::from_str(line)
            .with_context(|| format!("parse {} line {}", path, n + 1))?;
        out.push(concept);
    }
    Ok(out)
}
