// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action: a named, versioned, declarative unit (§3).

use crate::ids::ActionId;
use crate::matcher::InputMatcher;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One named input an Action declares, with the predicate that selects
/// satisfying Facts and whether the input is required or optional (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub matcher: InputMatcher,
    pub required: bool,
}

impl InputSpec {
    pub fn required(matcher: InputMatcher) -> Self {
        Self { matcher, required: true }
    }

    pub fn optional(matcher: InputMatcher) -> Self {
        Self { matcher, required: false }
    }
}

/// A named, versioned, declarative unit produced by evaluating a [`crate::Source`].
///
/// Never mutated after creation; a new version gets a new [`ActionId`] but
/// keeps the same `name` (history is retained, §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    pub source: String,
    pub meta: serde_json::Value,
    pub inputs: HashMap<String, InputSpec>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Action {
    /// Required input names, in a stable (sorted) order.
    pub fn required_inputs(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .inputs
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Action {
    /// Build an Action for tests: `name`, one required input matching `matcher`.
    pub fn test_fixture(name: &str, input_name: &str, matcher: InputMatcher) -> Self {
        let mut inputs = HashMap::new();
        inputs.insert(input_name.to_string(), InputSpec::required(matcher));
        Action {
            id: ActionId::new(),
            name: name.to_string(),
            source: format!("file:///actions/{name}"),
            meta: serde_json::json!({}),
            inputs,
            created_at: chrono::Utc::now(),
        }
    }
}
