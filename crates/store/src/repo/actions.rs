// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ActionRepository`: `save`, `get_by_id`, `get_by_name`, paged `get_all` (§4.1).

use crate::error::StoreError;
use cicero_core::{Action, ActionId, InputSpec};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

pub fn save(conn: &Connection, action: &Action) -> Result<(), StoreError> {
    let inputs = serde_json::to_string(&action.inputs)
        .map_err(|e| StoreError::Invalid(format!("action inputs: {e}")))?;
    conn.execute(
        "INSERT INTO actions (id, name, source, meta, inputs, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            action.id.to_string(),
            action.name,
            action.source,
            action.meta.to_string(),
            inputs,
            action.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_by_id(conn: &Connection, id: ActionId) -> Result<Action, StoreError> {
    conn.query_row("SELECT * FROM actions WHERE id = ?1", params![id.to_string()], from_row)
        .optional()?
        .ok_or(StoreError::NotFound)
}

/// Every Action registered under `name`, newest first — the Brain's
/// "currently-active Actions" query filters this to the latest version.
pub fn get_by_name(conn: &Connection, name: &str) -> Result<Vec<Action>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT * FROM actions WHERE name = ?1 ORDER BY created_at DESC")?;
    let rows = stmt.query_map(params![name], from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

/// The latest (by `created_at`) version registered under `name`, i.e. the
/// only version the Brain matches against (§3: "superseded by new versions
/// ... history is retained" — but matching only ever targets the latest).
pub fn get_latest_by_name(conn: &Connection, name: &str) -> Result<Action, StoreError> {
    get_by_name(conn, name)?.into_iter().next().ok_or(StoreError::NotFound)
}

pub fn get_all(conn: &Connection, page_size: u32, offset: u32) -> Result<Vec<Action>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT * FROM actions ORDER BY created_at ASC LIMIT ?1 OFFSET ?2")?;
    let rows = stmt.query_map(params![page_size, offset], from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

/// Every distinct, latest-per-name Action — what `listen_to_facts` loads
/// fresh on each Fact (§4.4: "load all currently-active Actions").
pub fn get_all_latest(conn: &Connection) -> Result<Vec<Action>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT a.* FROM actions a
         INNER JOIN (SELECT name, MAX(created_at) AS created_at FROM actions GROUP BY name) latest
         ON a.name = latest.name AND a.created_at = latest.created_at",
    )?;
    let rows = stmt.query_map([], from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    let id: String = row.get("id")?;
    let inputs_json: String = row.get("inputs")?;
    let meta_json: String = row.get("meta")?;
    let created_at: String = row.get("created_at")?;
    let inputs: HashMap<String, InputSpec> = serde_json::from_str(&inputs_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;
    Ok(Action {
        id: ActionId::parse(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        name: row.get("name")?,
        source: row.get("source")?,
        meta: serde_json::from_str(&meta_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        inputs,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?
            .with_timezone(&chrono::Utc),
    })
}
