// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluation configuration (§7: "cache root via environment variable with a
//! user-cache fallback; default evaluator list; transformer list").

use std::path::PathBuf;

/// The knobs the Evaluation subsystem needs, independent of how the caller
/// loads them (env vars, CLI flags, ...).
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub cache_root: PathBuf,
    pub default_evaluators: Vec<String>,
    pub transformers: Vec<String>,
}

impl EvalConfig {
    /// `CICERO_CACHE_ROOT` env var, falling back to the OS user-cache dir
    /// joined with `cicero` (mirrors the adapters' `dirs::state_dir()`
    /// fallback chain).
    pub fn cache_root_from_env() -> PathBuf {
        std::env::var_os("CICERO_CACHE_ROOT").map(PathBuf::from).unwrap_or_else(|| {
            dirs::cache_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("cicero")
        })
    }
}
