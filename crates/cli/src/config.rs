// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration: where the database and cache live, which
//! Kubernetes namespace to submit jobs into, and which evaluators/
//! transformers the Invoker runs by default (mirrors
//! `oj_daemon::lifecycle::Config::load`, renamed to `CICERO_*`).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine a state directory: set CICERO_STATE_DIR or HOME")]
    NoStateDir,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (holds `cicero.sqlite3`).
    pub state_dir: PathBuf,
    /// Path to the SQLite database.
    pub db_path: PathBuf,
    /// Kubernetes namespace jobs are submitted into.
    pub namespace: String,
    /// Evaluators tried in order when a start intent's Action doesn't name
    /// one explicitly (§4.3).
    pub default_evaluators: Vec<String>,
    /// Transformer chain applied to evaluator output before decoding (§4.3).
    pub transformers: Vec<String>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// - `CICERO_STATE_DIR` (falls back to `XDG_STATE_HOME/cicero`, then
    ///   `~/.local/state/cicero`): where the database lives.
    /// - `CICERO_NAMESPACE` (default `default`): Kubernetes namespace.
    /// - `CICERO_DEFAULT_EVALUATORS`: comma-separated evaluator names.
    /// - `CICERO_TRANSFORMERS`: comma-separated transformer names, in order.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = state_dir()?;
        let db_path = state_dir.join("cicero.sqlite3");
        let namespace = std::env::var("CICERO_NAMESPACE").unwrap_or_else(|_| "default".to_string());
        let default_evaluators = comma_list("CICERO_DEFAULT_EVALUATORS");
        let transformers = comma_list("CICERO_TRANSFORMERS");
        Ok(Self { state_dir, db_path, namespace, default_evaluators, transformers })
    }
}

fn comma_list(var: &str) -> Vec<String> {
    std::env::var(var)
        .ok()
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("CICERO_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("cicero"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
    Ok(home.join(".local/state/cicero"))
}
