// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level error kinds (§7): distinguishes transient/retryable
//! conditions from fatal invariant violations so the supervisor (`supervisor.rs`)
//! knows whether a crashed task should simply restart.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] cicero_store::StoreError),

    #[error(transparent)]
    Eval(#[from] cicero_eval::EvalError),

    #[error(transparent)]
    Scheduler(#[from] cicero_scheduler::SchedulerError),
}

impl EngineError {
    /// Fatal conditions the supervisor must not silently paper over (§7:
    /// "invariant violations ... fatal"). Everything else is treated as
    /// transient infrastructure noise and simply retried by restarting the task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Store(cicero_store::StoreError::InvariantViolation(_)))
    }
}
