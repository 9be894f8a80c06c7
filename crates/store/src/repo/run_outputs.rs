// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunOutputRepository`: `save`, `get_by_run_id`, `delete`.
//!
//! Presence of a row *is* the "Run is still live" signal (§3); deletion is
//! how both normal termination (§4.6) and operator cancel (§5) retire a Run.

use crate::error::StoreError;
use cicero_core::{RunId, RunOutput};
use rusqlite::{params, Connection, OptionalExtension};

pub fn save(conn: &Connection, output: &RunOutput) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO run_outputs (run_id, success, failure) VALUES (?1, ?2, ?3)",
        params![output.run_id.to_string(), output.success.to_string(), output.failure.to_string()],
    )?;
    Ok(())
}

pub fn get_by_run_id(conn: &Connection, run_id: RunId) -> Result<Option<RunOutput>, StoreError> {
    conn.query_row(
        "SELECT run_id, success, failure FROM run_outputs WHERE run_id = ?1",
        params![run_id.to_string()],
        |row| {
            let run_id: String = row.get(0)?;
            let success: String = row.get(1)?;
            let failure: String = row.get(2)?;
            Ok((run_id, success, failure))
        },
    )
    .optional()?
    .map(|(run_id, success, failure)| {
        Ok(RunOutput {
            run_id: RunId::parse(&run_id)
                .map_err(|e| StoreError::Invalid(format!("run_outputs.run_id: {e}")))?,
            success: serde_json::from_str(&success)
                .map_err(|e| StoreError::Invalid(format!("run_outputs.success: {e}")))?,
            failure: serde_json::from_str(&failure)
                .map_err(|e| StoreError::Invalid(format!("run_outputs.failure: {e}")))?,
        })
    })
    .transpose()
}

/// Delete the RunOutput if present. Returns whether a row was actually
/// deleted, so callers (the job-event consumer, the cancel path) can tell
/// "I finalized this Run" from "someone already did" (§5 cancel-race note).
pub fn delete(conn: &Connection, run_id: RunId) -> Result<bool, StoreError> {
    let changed = conn.execute("DELETE FROM run_outputs WHERE run_id = ?1", params![run_id.to_string()])?;
    Ok(changed > 0)
}
