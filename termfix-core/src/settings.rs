//! Clap-free settings for a fix run.

use camino::Utf8PathBuf;
use termfix_domain::Params;

/// Settings for one `run_fix` invocation.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub fix_key: String,

    /// Project branch; task branches are created beneath it.
    pub project_branch: String,
    pub task_prefix: String,

    /// No server writes; outcomes are reported as if saved.
    pub dry_run: bool,
    pub max_task_size: usize,
    /// `1` runs tasks in order on the calling thread.
    pub workers: usize,
    pub params: Params,

    pub group_by_key: bool,
    pub report_no_change: bool,
    pub include_inactive: bool,

    /// Skip tasks with a lower index (resume an interrupted run).
    pub restart_from_task: Option<usize>,

    pub out_dir: Utf8PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            fix_key: String::new(),
            project_branch: "MAIN".to_string(),
            task_prefix: "task".to_string(),
            dry_run: true,
            max_task_size: 25,
            workers: 1,
            params: Params::new(),
            group_by_key: false,
            report_no_change: false,
            include_inactive: false,
            restart_from_task: None,
            out_dir: Utf8PathBuf::from("termfix-out"),
        }
    }
}
