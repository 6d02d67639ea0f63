//! Rendering helpers (markdown) for human-readable artifacts.

use termfix_types::{Batch, ReportRow, RunReport, RunStatus, Severity};

pub fn render_run_md(report: &RunReport, batch: &Batch) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str(&format!("# termfix run: `{}`\n\n", report.fix_key));
    out.push_str(&format!("- Status: `{}`\n", status_label(report.status)));
    out.push_str(&format!("- Branch: `{}`\n", report.branch));
    out.push_str(&format!(
        "- Mode: {}\n",
        if report.dry_run { "dry run" } else { "apply" }
    ));
    out.push_str(&format!(
        "- Tasks: {} (skipped {})\n",
        s.tasks, s.skipped_tasks
    ));
    out.push_str(&format!(
        "- Concepts: {}\n- Changed: {} ({} changes)\n- No change: {}\n- Validation failures: {}\n- Fatal errors: {}\n\n",
        s.concepts, s.changed, s.changes, s.no_change, s.validation_failures, s.fatal_errors
    ));

    out.push_str("## Tasks\n\n");
    if batch.is_empty() {
        out.push_str("_No candidates selected._\n");
        return out;
    }

    out.push_str("| # | Branch | Concepts | Key |\n");
    out.push_str("|---|--------|----------|-----|\n");
    for task in batch.iter() {
        out.push_str(&format!(
            "| {} | `{}` | {} | {} |\n",
            task.index,
            task.branch,
            task.len(),
            task.group_key.as_deref().unwrap_or("-")
        ));
    }

    out
}

/// Rows at or above `min` severity as a markdown table, in input order.
pub fn render_rows_md(rows: &[ReportRow], min: Severity) -> String {
    let rows: Vec<&ReportRow> = rows.iter().filter(|r| r.severity >= min).collect();
    if rows.is_empty() {
        return "_Nothing to report._\n".to_string();
    }

    let mut out = String::new();
    out.push_str("| Concept | FSN | Action | Severity | Detail |\n");
    out.push_str("|---------|-----|--------|----------|--------|\n");
    for r in rows {
        out.push_str(&format!(
            "| {} | {} | `{}` | {:?} | {} |\n",
            r.concept_id,
            escape(r.fsn.as_deref().unwrap_or("")),
            r.action.as_str(),
            r.severity,
            escape(&r.detail)
        ));
    }
    out
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pass => "pass",
        RunStatus::Warn => "warn",
        RunStatus::Fail => "fail",
    }
}

fn escape(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use termfix_types::{ActionType, ConceptId, RunSummary, Task};

    fn batch() -> Batch {
        let concepts = vec![ConceptId(1), ConceptId(2)];
        Batch {
            tasks: vec![Task {
                id: Task::deterministic_id(&concepts),
                index: 0,
                branch: "MAIN/PROJ/task-000".into(),
                concepts,
                max_size: 5,
                constraints: vec![],
                group_key: Some("disorder".into()),
            }],
        }
    }

    #[test]
    fn run_md_lists_counts_and_tasks() {
        let mut report = RunReport::new("relationship.remove_duplicates", "MAIN/PROJ", true);
        report.finish(RunSummary {
            tasks: 1,
            concepts: 2,
            changed: 1,
            changes: 3,
            no_change: 1,
            ..Default::default()
        });
        let md = render_run_md(&report, &batch());
        assert!(md.starts_with("# termfix run: `relationship.remove_duplicates`"));
        assert!(md.contains("- Status: `pass`"));
        assert!(md.contains("- Mode: dry run"));
        assert!(md.contains("- Changed: 1 (3 changes)"));
        assert!(md.contains("| 0 | `MAIN/PROJ/task-000` | 2 | disorder |"));
    }

    #[test]
    fn empty_batch_says_so() {
        let report = RunReport::new("x", "MAIN", false);
        let md = render_run_md(&report, &Batch::default());
        assert!(md.contains("_No candidates selected._"));
        assert!(md.contains("- Mode: apply"));
    }

    #[test]
    fn rows_md_filters_by_severity_and_escapes() {
        let rows = vec![
            ReportRow::new("t", ConceptId(1), Severity::Low, ActionType::RelationshipAdded, "a"),
            ReportRow::new("t", ConceptId(2), Severity::High, ActionType::ValidationCheck, "dup | x")
                .with_fsn("Y (finding)"),
        ];
        let md = render_rows_md(&rows, Severity::High);
        assert_eq!(
            md.lines().nth(2),
            Some("| 2 | Y (finding) | `VALIDATION_CHECK` | High | dup \\| x |")
        );
        assert_eq!(render_rows_md(&rows, Severity::Critical), "_Nothing to report._\n");
    }
}
