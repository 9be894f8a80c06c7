// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external scheduler's event stream shape (§6: "Event stream yields
//! batches `{index, events[]}`; each event has `{topic, type, index, body}`").

use chrono::{DateTime, Utc};
use cicero_core::RunId;
use serde::{Deserialize, Serialize};

/// Per-task (container) terminal state, one per container in the Job's pod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub name: String,
    pub failed: bool,
}

/// Whether a job's allocation has reached a terminal state (§4.6: "if its
/// client-status is non-terminal, ignore").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl ClientStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientStatus::Complete | ClientStatus::Failed)
    }
}

/// One allocation update: the Kubernetes analogue of a Nomad allocation,
/// derived from a Job/Pod status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub job_id: String,
    pub client_status: ClientStatus,
    pub task_states: Vec<TaskState>,
    pub modify_time: DateTime<Utc>,
}

impl Allocation {
    /// True if any task-state failed — the run's outcome per the rewritten
    /// §9 semantics ("if any task failed, publish failure; else success").
    pub fn any_task_failed(&self) -> bool {
        self.task_states.iter().any(|t| t.failed)
    }

    pub fn run_id(&self) -> Option<RunId> {
        crate::job_spec::parse_job_name(&self.job_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobEvent {
    AllocationUpdated { allocation: Allocation },
    Other { topic: String, body: serde_json::Value },
}

/// One batch from the event stream, carrying the monotonic index the
/// caller persists and resumes from (§3 `JobEventOffset`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    pub index: u64,
    pub events: Vec<JobEvent>,
}
