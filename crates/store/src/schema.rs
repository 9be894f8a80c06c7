// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema initialization.
//!
//! C1 (Persistence) and C2 (Log bus) share one SQLite database: the bus
//! topics are just more tables, so publishing a Fact/start-intent and
//! advancing a consumer offset commit in the same `rusqlite::Transaction`
//! as the state change that triggered them (see `DESIGN.md`, Open Question 3).

use crate::error::StoreError;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &mut Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "journal_mode", "wal")?;
    conn.pragma_update(None, "foreign_keys", "on")?;

    let tx = conn.transaction()?;
    tx.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_meta (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS actions (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            source TEXT NOT NULL,
            meta TEXT NOT NULL,
            inputs TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_actions_name ON actions(name);

        CREATE TABLE IF NOT EXISTS facts (
            id TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            binary BLOB,
            run_id TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_facts_run_id ON facts(run_id);
        CREATE INDEX IF NOT EXISTS idx_facts_created_at ON facts(created_at);

        CREATE TABLE IF NOT EXISTS runs (
            id TEXT PRIMARY KEY,
            action_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            finished_at TEXT,
            inputs TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_runs_action_id ON runs(action_id);

        CREATE TABLE IF NOT EXISTS run_outputs (
            run_id TEXT PRIMARY KEY,
            success TEXT NOT NULL,
            failure TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS job_events (
            idx INTEGER PRIMARY KEY,
            body TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS job_event_offset (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            offset INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fact_topic (
            partition TEXT NOT NULL,
            offset INTEGER NOT NULL,
            fact_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (partition, offset)
        );

        CREATE TABLE IF NOT EXISTS start_topic (
            partition TEXT NOT NULL,
            offset INTEGER NOT NULL,
            action_id TEXT NOT NULL,
            inputs TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (partition, offset)
        );

        CREATE TABLE IF NOT EXISTS action_topic (
            partition TEXT NOT NULL,
            offset INTEGER NOT NULL,
            action_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (partition, offset)
        );

        CREATE TABLE IF NOT EXISTS consumer_offsets (
            topic TEXT NOT NULL,
            partition TEXT NOT NULL,
            consumer TEXT NOT NULL,
            offset INTEGER NOT NULL,
            PRIMARY KEY (topic, partition, consumer)
        );
        ",
    )?;

    let version: Option<i64> =
        tx.query_row("SELECT version FROM schema_meta WHERE id = 0", [], |row| row.get(0)).ok();
    match version {
        None => {
            tx.execute("INSERT INTO schema_meta (id, version) VALUES (0, ?1)", [SCHEMA_VERSION])?;
        }
        Some(v) if v != SCHEMA_VERSION => {
            return Err(StoreError::Invalid(format!(
                "database schema version {v} does not match expected {SCHEMA_VERSION}"
            )));
        }
        Some(_) => {}
    }
    tx.commit()?;
    Ok(())
}
