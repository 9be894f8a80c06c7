// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunRepository`: `save`, `update` (finalize), `get_by_id`, paged `get_all`,
//! and the input-Fact-ID join the Brain's dedup check and §4.1's
//! "specialized joins" call for.

use crate::error::StoreError;
use cicero_core::{ActionId, FactId, Run, RunId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashSet};

pub fn save(conn: &Connection, run: &Run) -> Result<(), StoreError> {
    let inputs = serde_json::to_string(&run.inputs)
        .map_err(|e| StoreError::Invalid(format!("run inputs: {e}")))?;
    conn.execute(
        "INSERT INTO runs (id, action_id, created_at, finished_at, inputs) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            run.id.to_string(),
            run.action_id.to_string(),
            run.created_at.to_rfc3339(),
            run.finished_at.map(|t| t.to_rfc3339()),
            inputs,
        ],
    )?;
    Ok(())
}

/// Mark a Run finished at `finished_at` (§4.6 step 5: "Mark the Run as
/// finished at the allocation's modify-time (UTC), update the Run").
pub fn finish(
    conn: &Connection,
    id: RunId,
    finished_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE runs SET finished_at = ?1 WHERE id = ?2",
        params![finished_at.to_rfc3339(), id.to_string()],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn get_by_id(conn: &Connection, id: RunId) -> Result<Run, StoreError> {
    conn.query_row("SELECT * FROM runs WHERE id = ?1", params![id.to_string()], from_row)
        .optional()?
        .ok_or(StoreError::NotFound)
}

pub fn get_all(conn: &Connection, page_size: u32, offset: u32) -> Result<Vec<Run>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT * FROM runs ORDER BY created_at ASC LIMIT ?1 OFFSET ?2")?;
    let rows = stmt.query_map(params![page_size, offset], from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

pub fn get_by_action_id(conn: &Connection, action_id: ActionId) -> Result<Vec<Run>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM runs WHERE action_id = ?1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map(params![action_id.to_string()], from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

/// The most recently created Run for `action_id` (ported from the original's
/// `GetLatestByActionId`, `run.go`).
pub fn get_latest_by_action_id(conn: &Connection, action_id: ActionId) -> Result<Run, StoreError> {
    conn.query_row(
        "SELECT * FROM runs WHERE action_id = ?1 ORDER BY created_at DESC LIMIT 1",
        params![action_id.to_string()],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound)
}

/// True iff a Run already exists for `action_id` whose input-Fact-ID set is
/// exactly `fact_ids` — the Brain's idempotent-dedup check (§4.4: "dedup key
/// = (action-id, sorted input-Fact-IDs)").
pub fn exists_with_exact_inputs(
    conn: &Connection,
    action_id: ActionId,
    fact_ids: &[FactId],
) -> Result<bool, StoreError> {
    let wanted: HashSet<FactId> = fact_ids.iter().copied().collect();
    for run in get_by_action_id(conn, action_id)? {
        let have: HashSet<FactId> = run.inputs.values().copied().collect();
        if have == wanted {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Runs whose input-Fact set references any of `fact_ids`.
///
/// When `recursive` is true, also includes Runs whose inputs reference a
/// Fact produced (`Fact.run_id`) by one of the directly-matching Runs, one
/// hop deep — ported from the original's `GetByInputFactIds(ids, recursive,
/// page)` (`run.go`); no engine loop currently calls this recursively, but it
/// is kept as a repository-level capability per §4.1's "specialized joins".
pub fn get_by_input_fact_ids(
    conn: &Connection,
    fact_ids: &[FactId],
    recursive: bool,
) -> Result<Vec<Run>, StoreError> {
    let wanted: HashSet<FactId> = fact_ids.iter().copied().collect();
    let all = get_all(conn, u32::MAX, 0)?;
    let mut direct: Vec<Run> =
        all.iter().filter(|r| r.inputs.values().any(|f| wanted.contains(f))).cloned().collect();
    if !recursive {
        return Ok(direct);
    }

    let direct_ids: HashSet<RunId> = direct.iter().map(|r| r.id).collect();
    let mut produced_facts = HashSet::new();
    let mut stmt = conn.prepare("SELECT id FROM facts WHERE run_id = ?1")?;
    for run_id in &direct_ids {
        let ids = stmt.query_map(params![run_id.to_string()], |row| {
            let s: String = row.get(0)?;
            Ok(s)
        })?;
        for id in ids {
            produced_facts.insert(id?);
        }
    }
    for run in &all {
        if direct_ids.contains(&run.id) {
            continue;
        }
        let references_derived =
            run.inputs.values().any(|f| produced_facts.contains(&f.to_string()));
        if references_derived {
            direct.push(run.clone());
        }
    }
    Ok(direct)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Run> {
    let id: String = row.get("id")?;
    let action_id: String = row.get("action_id")?;
    let created_at: String = row.get("created_at")?;
    let finished_at: Option<String> = row.get("finished_at")?;
    let inputs_json: String = row.get("inputs")?;
    let inputs: BTreeMap<String, FactId> = serde_json::from_str(&inputs_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;
    Ok(Run {
        id: RunId::parse(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        action_id: ActionId::parse(&action_id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?
            .with_timezone(&chrono::Utc),
        finished_at: finished_at
            .map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|t| t.with_timezone(&chrono::Utc)))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        inputs,
    })
}
