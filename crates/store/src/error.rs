// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store-level error kinds (§4.1: "a distinguished not-found condition
//! distinguishable from other errors").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("database pool/task error: {0}")]
    Task(String),

    #[error("invalid stored data: {0}")]
    Invalid(String),

    /// §7 "invariant violations ... fatal": the job-event offset regressed,
    /// or a Run ID collided with different inputs.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}
