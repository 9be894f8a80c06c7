// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `FactRepository`: `save`, `get_by_id`, paged `get_all` (§4.1, §3).

use crate::error::StoreError;
use cicero_core::{Fact, FactId, RunId};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub fn save(conn: &Connection, fact: &Fact) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO facts (id, value, binary, run_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            fact.id.to_string(),
            fact.value.to_string(),
            fact.binary,
            fact.run_id.map(|id| id.to_string()),
            fact.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_by_id(conn: &Connection, id: FactId) -> Result<Fact, StoreError> {
    conn.query_row("SELECT * FROM facts WHERE id = ?1", params![id.to_string()], from_row)
        .optional()?
        .ok_or(StoreError::NotFound)
}

pub fn get_all(conn: &Connection, page_size: u32, offset: u32) -> Result<Vec<Fact>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT * FROM facts ORDER BY created_at ASC LIMIT ?1 OFFSET ?2")?;
    let rows = stmt.query_map(params![page_size, offset], from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

/// All Facts created at or after `created_at`, newest first — used by the
/// matcher's newest-Fact tie-break (§4.4) and to re-match the whole history
/// for a newly-registered Action (§4.4 "Listen-to-Actions").
pub fn get_all_newest_first(conn: &Connection) -> Result<Vec<Fact>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM facts ORDER BY created_at DESC, id DESC")?;
    let rows = stmt.query_map([], from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Fact> {
    let id: String = row.get("id")?;
    let value_json: String = row.get("value")?;
    let run_id: Option<String> = row.get("run_id")?;
    let created_at: String = row.get("created_at")?;
    Ok(Fact {
        id: FactId::parse(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        value: serde_json::from_str(&value_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        binary: row.get("binary")?,
        run_id: run_id
            .map(|s| RunId::parse(&s))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?
            .with_timezone(&chrono::Utc),
    })
}
