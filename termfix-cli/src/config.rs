//! Configuration file loading for termfix.
//!
//! Discovers `termfix.toml` in the working directory and merges it with CLI arguments
//! (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "termfix.toml";

/// Top-level configuration from termfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TermfixConfig {
    pub run: RunConfig,

    /// Fixer parameters.
    pub params: BTreeMap<String, String>,
}

/// `[run]` defaults. Unset keys fall back to the library defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub branch: Option<String>,
    pub task_prefix: Option<String>,
    pub max_task_size: Option<usize>,
    pub workers: Option<usize>,
    pub report_no_change: bool,
    pub group_by_key: bool,
}

pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        debug!("found config file at {}", path);
        Some(path)
    } else {
        debug!("no config file at {}", path);
        None
    }
}

pub fn load_config(path: &Utf8Path) -> anyhow::Result<TermfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<TermfixConfig> {
    toml::from_str(contents).context("invalid TOML")
}

/// Load config from `dir`, or return default if not found.
pub fn load_or_default(dir: &Utf8Path) -> anyhow::Result<TermfixConfig> {
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(TermfixConfig::default()),
    }
}

/// `run` arguments that may override the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub branch: Option<String>,
    pub task_prefix: Option<String>,
    pub max_task_size: Option<usize>,
    pub workers: Option<usize>,
    pub report_no_change: bool,
    pub group_by_key: bool,
    pub params: BTreeMap<String, String>,
}

/// Config file and CLI arguments combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedConfig {
    pub branch: String,
    pub task_prefix: String,
    pub max_task_size: usize,
    pub workers: usize,
    pub report_no_change: bool,
    pub group_by_key: bool,
    pub params: BTreeMap<String, String>,
}

pub struct ConfigMerger {
    config: TermfixConfig,
}

impl ConfigMerger {
    pub fn new(config: TermfixConfig) -> Self {
        Self { config }
    }

    /// Scalar CLI values replace file values; boolean flags can only switch a setting on.
    /// CLI params extend and override file params.
    pub fn merge_run_args(self, cli: RunOverrides, defaults: &MergedConfig) -> MergedConfig {
        let run = self.config.run;
        let mut params = self.config.params;
        params.extend(cli.params);

        MergedConfig {
            branch: cli
                .branch
                .or(run.branch)
                .unwrap_or_else(|| defaults.branch.clone()),
            task_prefix: cli
                .task_prefix
                .or(run.task_prefix)
                .unwrap_or_else(|| defaults.task_prefix.clone()),
            max_task_size: cli
                .max_task_size
                .or(run.max_task_size)
                .unwrap_or(defaults.max_task_size),
            workers: cli.workers.or(run.workers).unwrap_or(defaults.workers),
            report_no_change: cli.report_no_change || run.report_no_change,
            group_by_key: cli.group_by_key || run.group_by_key,
            params,
        }
    }
}

/// Parse CLI params from `key=value` strings. Values may be empty (e.g. `replace=`).
pub fn parse_cli_params(params: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for entry in params {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid param '{}': expected key=value", entry))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("invalid param '{}': missing key", entry);
        }
        out.insert(key.to_string(), value.to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn defaults() -> MergedConfig {
        MergedConfig {
            branch: "MAIN".into(),
            task_prefix: "task".into(),
            max_task_size: 25,
            workers: 1,
            report_no_change: false,
            group_by_key: false,
            params: BTreeMap::new(),
        }
    }

    #[test]
    fn parse_example_config() {
        let config = parse_config(
            r#"
[run]
branch = "MAIN/PROJ"
max_task_size = 10
group_by_key = true

[params]
find = "Lung"
replace = "Pulmonary"
"#,
        )
        .unwrap();
        assert_eq!(config.run.branch.as_deref(), Some("MAIN/PROJ"));
        assert_eq!(config.run.max_task_size, Some(10));
        assert!(config.run.group_by_key);
        assert_eq!(config.params["replace"], "Pulmonary");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("[run]\nbranches = 3\n").is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        let config = load_or_default(dir).unwrap();
        assert!(config.run.branch.is_none());
        assert!(config.params.is_empty());
    }

    #[test]
    fn discovered_file_is_loaded() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "[run]\nworkers = 4\n").unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        assert_eq!(load_or_default(dir).unwrap().run.workers, Some(4));
    }

    #[test]
    fn cli_takes_precedence() {
        let config = parse_config(
            r#"
[run]
branch = "MAIN/FILE"
workers = 2
report_no_change = true

[params]
find = "a"
replace = "b"
"#,
        )
        .unwrap();
        let cli = RunOverrides {
            branch: Some("MAIN/CLI".into()),
            max_task_size: Some(3),
            params: parse_cli_params(&["replace=c".into()]).unwrap(),
            ..Default::default()
        };
        let merged = ConfigMerger::new(config).merge_run_args(cli, &defaults());

        assert_eq!(merged.branch, "MAIN/CLI");
        assert_eq!(merged.workers, 2);
        assert_eq!(merged.max_task_size, 3);
        assert_eq!(merged.task_prefix, "task");
        assert!(merged.report_no_change);
        assert_eq!(merged.params["find"], "a");
        assert_eq!(merged.params["replace"], "c");
    }

    #[test]
    fn cli_params_parsing() {
        let p = parse_cli_params(&["find=Lung ".into(), "replace=".into()]).unwrap();
        assert_eq!(p["find"], "Lung ");
        assert_eq!(p["replace"], "");
        assert!(parse_cli_params(&["novalue".into()]).is_err());
        assert!(parse_cli_params(&["=x".into()]).is_err());
    }
}
