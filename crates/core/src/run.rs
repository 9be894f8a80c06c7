// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run and RunOutput: a pending or completed Action execution (§3).

use crate::ids::{ActionId, FactId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pending or completed execution of an Action.
///
/// The `id` doubles as the external scheduler's job ID (§3). Never re-used:
/// once created a Run row exists for the lifetime of that job, even after
/// termination (only its paired [`RunOutput`] is deleted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub action_id: ActionId,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// input-name -> input Fact ID, the set of Facts that satisfied the
    /// Action's inputs at dispatch time.
    pub inputs: BTreeMap<String, FactId>,
}

impl Run {
    pub fn new(action_id: ActionId, inputs: BTreeMap<String, FactId>, created_at: DateTime<Utc>) -> Self {
        Run { id: RunId::new(), action_id, created_at, finished_at: None, inputs }
    }

    pub fn is_terminal(&self) -> bool {
        self.finished_at.is_some()
    }

    /// The sorted input-Fact-ID set used as half of the Brain's dedup key
    /// (§4.4: "dedup key = (action-id, sorted input-Fact-IDs)").
    pub fn input_fact_ids(&self) -> Vec<FactId> {
        let mut ids: Vec<FactId> = self.inputs.values().copied().collect();
        ids.sort_unstable_by_key(|id| id.as_uuid());
        ids
    }
}

/// Transient metadata paired with a pending Run: the success/failure Fact
/// templates to publish on termination.
///
/// Its presence is the signal that the Run is still live (§3): created with
/// the Run, deleted exactly when the Run terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub run_id: RunId,
    pub success: serde_json::Value,
    pub failure: serde_json::Value,
}

impl RunOutput {
    pub fn new(run_id: RunId, success: serde_json::Value, failure: serde_json::Value) -> Self {
        RunOutput { run_id, success, failure }
    }

    /// Select the template to publish given whether any task failed
    /// (§9 REDESIGN FLAG: "if any task failed, publish failure; else success").
    pub fn select(&self, any_task_failed: bool) -> &serde_json::Value {
        if any_task_failed {
            &self.failure
        } else {
            &self.success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_picks_failure_when_any_task_failed() {
        let output = RunOutput::new(RunId::new(), json!({"ok": true}), json!({"ok": false}));
        assert_eq!(output.select(true), &json!({"ok": false}));
        assert_eq!(output.select(false), &json!({"ok": true}));
    }

    #[test]
    fn input_fact_ids_are_sorted_for_dedup_key() {
        let mut inputs = BTreeMap::new();
        let (f1, f2) = (FactId::new(), FactId::new());
        inputs.insert("b".to_string(), f2);
        inputs.insert("a".to_string(), f1);
        let run = Run::new(ActionId::new(), inputs, Utc::now());
        // BTreeMap iterates by key, not insertion order, but the *value* set
        // used for dedup is what matters — confirm both IDs are present.
        let ids = run.input_fact_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&f1));
        assert!(ids.contains(&f2));
    }
}
