// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobEventRepository`: the persisted offset into the external scheduler's
//! event stream, plus the raw events themselves (§3 `JobEventOffset`, §4.6).

use crate::error::StoreError;
use cicero_core::{JobEventOffset, JobEventRecord};
use rusqlite::{params, Connection, OptionalExtension};

pub fn get_offset(conn: &Connection) -> Result<JobEventOffset, StoreError> {
    let offset: Option<i64> = conn
        .query_row("SELECT offset FROM job_event_offset WHERE id = 0", [], |row| row.get(0))
        .optional()?;
    Ok(JobEventOffset(offset.unwrap_or(0) as u64))
}

/// Persist the raw event and advance the offset, in the caller's
/// transaction (§4.6: "Persist the event ... and advance the offset — all
/// within the same transaction").
///
/// Errors with [`StoreError::InvariantViolation`] if `index` would move the
/// offset backwards (§7: "event stream regression below persisted offset").
pub fn record_and_advance(conn: &Connection, record: &JobEventRecord) -> Result<(), StoreError> {
    let current = get_offset(conn)?;
    if record.index <= current.0 && current.0 != 0 {
        return Err(StoreError::InvariantViolation(format!(
            "job event index {} is at or below persisted offset {}",
            record.index, current.0
        )));
    }
    conn.execute(
        "INSERT INTO job_events (idx, body) VALUES (?1, ?2)",
        params![record.index as i64, record.body.to_string()],
    )?;
    conn.execute(
        "INSERT INTO job_event_offset (id, offset) VALUES (0, ?1)
         ON CONFLICT(id) DO UPDATE SET offset = excluded.offset",
        params![record.index as i64],
    )?;
    Ok(())
}
