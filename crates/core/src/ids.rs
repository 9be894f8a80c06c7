// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! 128-bit opaque identifiers for the four core entity families.

crate::define_uuid_id! {
    /// Identifier of an [`crate::Action`]. Stable across re-evaluation; a new
    /// source version gets a new `ActionId` but keeps the same `name`.
    pub struct ActionId;
}

crate::define_uuid_id! {
    /// Identifier of a [`crate::Fact`]. Never reassigned, never reused.
    pub struct FactId;
}

crate::define_uuid_id! {
    /// Identifier of a [`crate::Run`].
    ///
    /// Doubles as the external scheduler's job ID/name (see
    /// `cicero_scheduler::job_name`), so its string form must stay a valid
    /// Kubernetes object name (lowercase UUID already satisfies this).
    pub struct RunId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serializes_as_plain_uuid_string() {
        let id = ActionId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }
}
