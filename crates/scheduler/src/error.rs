// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler-level error kinds (§6, §7 "transient infrastructure").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("job {0} not found")]
    NotFound(String),

    #[error("invalid job spec: {0}")]
    InvalidSpec(String),

    #[error("watch stream error: {0}")]
    Watch(String),
}
