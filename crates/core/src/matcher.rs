// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input matcher predicates.
//!
//! An [`InputMatcher`] is the opaque-to-storage, meaningful-to-the-Brain
//! predicate an evaluator attaches to an [`crate::Action`] input. It is
//! stored and transmitted as plain JSON (§3 "matcher predicate over Facts")
//! and evaluated against each candidate [`crate::Fact`]'s `value`.
//!
//! Supported shape (a small boolean algebra over dotted-path lookups —
//! deliberately not a full jq grammar, since the spec only requires
//! predicate evaluation, not a general query language):
//!
//! ```json
//! {"eq": {"path": "kind", "value": "build"}}
//! {"exists": "commit.sha"}
//! {"all": [{"eq": {"path": "kind", "value": "build"}}, {"exists": "commit.sha"}]}
//! {"any": [...]}
//! {"not": {...}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMatcher {
    Eq { path: String, value: Value },
    Exists { exists: String },
    All(Vec<InputMatcher>),
    Any(Vec<InputMatcher>),
    Not(Box<InputMatcher>),
}

impl InputMatcher {
    pub fn eq(path: impl Into<String>, value: Value) -> Self {
        InputMatcher::Eq { path: path.into(), value }
    }

    pub fn exists(path: impl Into<String>) -> Self {
        InputMatcher::Exists { exists: path.into() }
    }

    /// Evaluate the predicate against a Fact's JSON value.
    pub fn matches(&self, fact_value: &Value) -> bool {
        match self {
            InputMatcher::Eq { path, value } => {
                lookup(fact_value, path).is_some_and(|v| v == value)
            }
            InputMatcher::Exists { exists } => lookup(fact_value, exists).is_some(),
            InputMatcher::All(preds) => preds.iter().all(|p| p.matches(fact_value)),
            InputMatcher::Any(preds) => preds.iter().any(|p| p.matches(fact_value)),
            InputMatcher::Not(pred) => !pred.matches(fact_value),
        }
    }
}

/// Dot-separated path lookup into a JSON value (`"commit.sha"` -> `.commit.sha`).
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |acc, segment| acc.get(segment))
}
