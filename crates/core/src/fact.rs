// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fact: an immutable, timestamped observation (§3).

use crate::ids::{FactId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable, timestamped observation.
///
/// Created atomically, exactly once per acceptance; never modified or
/// deleted (§3 invariants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: FactId,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<Vec<u8>>,
    /// Back-reference to the Run that produced this Fact, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub created_at: DateTime<Utc>,
}

impl Fact {
    /// A freshly-observed Fact with no run back-reference (the common case:
    /// an external observation rather than a Run outcome).
    pub fn observed(value: serde_json::Value, created_at: DateTime<Utc>) -> Self {
        Fact { id: FactId::new(), value, binary: None, run_id: None, created_at }
    }

    /// A Fact published by a Run's terminal outcome (§4.6 step 4).
    pub fn from_run(run_id: RunId, value: serde_json::Value, created_at: DateTime<Utc>) -> Self {
        Fact { id: FactId::new(), value, binary: None, run_id: Some(run_id), created_at }
    }
}
