// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error kinds for domain-level invariant violations.
//!
//! Infrastructure errors (database, subprocess, scheduler) live in their own
//! crates (`cicero-store`, `cicero-eval`, `cicero-scheduler`); this is only
//! for violations of invariants the domain types themselves can detect.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("input matcher is not valid JSON for a predicate: {0}")]
    InvalidMatcher(String),

    #[error("action input {0:?} has no matching fact but is required")]
    MissingRequiredInput(String),
}
