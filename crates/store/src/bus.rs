// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The log bus (C2, §4.2): two append-only, offset-ordered tables living in
//! the same database as the state they describe, plus a durable consumer
//! offset table.
//!
//! `fact_topic` publishes every accepted Fact; `start_topic` publishes every
//! Run-start intent, one partition per Action name (an intent is always
//! about exactly one Action). `fact_topic` uses a single partition —
//! matching needs the *whole* Fact history regardless of which Action a
//! Fact eventually satisfies, so per-action sharding only becomes
//! meaningful once there is more than one Brain instance to shard across
//! (§1 Non-goals: "distributed horizontal scale-out" is explicitly out of
//! scope), and a single partition keeps FIFO consumption trivial to reason
//! about in the meantime.

use crate::error::StoreError;
use cicero_core::{ActionId, FactId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

pub const FACT_TOPIC: &str = "fact";
pub const START_TOPIC: &str = "start";
pub const ACTION_TOPIC: &str = "action";
pub const FACT_PARTITION: &str = "global";
pub const ACTION_PARTITION: &str = "global";

#[derive(Debug, Clone, PartialEq)]
pub struct FactTopicEntry {
    pub offset: u64,
    pub fact_id: FactId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionTopicEntry {
    pub offset: u64,
    pub action_id: ActionId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartIntent {
    pub offset: u64,
    pub partition: String,
    pub action_id: ActionId,
    pub inputs: BTreeMap<String, FactId>,
    pub created_at: DateTime<Utc>,
}

fn next_offset(conn: &Connection, table: &str, partition: &str) -> Result<u64, StoreError> {
    let sql = format!("SELECT COALESCE(MAX(offset), -1) FROM {table} WHERE partition = ?1");
    let max: i64 = conn.query_row(&sql, params![partition], |row| row.get(0))?;
    Ok((max + 1) as u64)
}

/// Publish a Fact onto `fact.*` (§4.2). Caller passes `&Transaction` so this
/// commits atomically with the Fact row insert (§3: "Each insertion is also
/// published on the log bus' fact topic").
pub fn publish_fact(
    conn: &Connection,
    fact_id: FactId,
    created_at: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let offset = next_offset(conn, "fact_topic", FACT_PARTITION)?;
    conn.execute(
        "INSERT INTO fact_topic (partition, offset, fact_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![FACT_PARTITION, offset as i64, fact_id.to_string(), created_at.to_rfc3339()],
    )?;
    Ok(offset)
}

/// Publish a start intent onto `start.<action-name>` (§4.4).
pub fn publish_start(
    conn: &Connection,
    partition: &str,
    action_id: ActionId,
    inputs: &BTreeMap<String, FactId>,
    created_at: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let offset = next_offset(conn, "start_topic", partition)?;
    let inputs_json = serde_json::to_string(inputs)
        .map_err(|e| StoreError::Invalid(format!("start intent inputs: {e}")))?;
    conn.execute(
        "INSERT INTO start_topic (partition, offset, action_id, inputs, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![partition, offset as i64, action_id.to_string(), inputs_json, created_at.to_rfc3339()],
    )?;
    Ok(offset)
}

/// Publish an Action-registered notification onto `action.*` (§4.4
/// "Listen-to-Actions": "consume notifications that a new Action has been
/// registered").
pub fn publish_action(
    conn: &Connection,
    action_id: ActionId,
    created_at: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let offset = next_offset(conn, "action_topic", ACTION_PARTITION)?;
    conn.execute(
        "INSERT INTO action_topic (partition, offset, action_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![ACTION_PARTITION, offset as i64, action_id.to_string(), created_at.to_rfc3339()],
    )?;
    Ok(offset)
}

/// The next offset `consumer` has not yet read (0 if it has never consumed
/// from this topic/partition).
pub fn consumer_offset(
    conn: &Connection,
    topic: &str,
    partition: &str,
    consumer: &str,
) -> Result<u64, StoreError> {
    let offset: Option<i64> = conn
        .query_row(
            "SELECT offset FROM consumer_offsets WHERE topic = ?1 AND partition = ?2 AND consumer = ?3",
            params![topic, partition, consumer],
            |row| row.get(0),
        )
        .optional()?;
    Ok(offset.map(|o| o as u64).unwrap_or(0))
}

/// Advance a consumer's next-to-read offset, in the same transaction as
/// whatever state change the consumed message triggered (§4.2: "persists its
/// own processing offset within the same transaction that commits the
/// resulting state change"). `offset` is the next offset to read, i.e. the
/// caller passes `last_consumed_offset + 1`.
pub fn advance_consumer_offset(
    conn: &Connection,
    topic: &str,
    partition: &str,
    consumer: &str,
    offset: u64,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO consumer_offsets (topic, partition, consumer, offset) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(topic, partition, consumer) DO UPDATE SET offset = excluded.offset",
        params![topic, partition, consumer, offset as i64],
    )?;
    Ok(())
}

/// Unconsumed `fact_topic` entries for `consumer`, in offset order.
pub fn poll_facts(conn: &Connection, consumer: &str, limit: u32) -> Result<Vec<FactTopicEntry>, StoreError> {
    let after = consumer_offset(conn, FACT_TOPIC, FACT_PARTITION, consumer)?;
    let mut stmt = conn.prepare(
        "SELECT offset, fact_id, created_at FROM fact_topic
         WHERE partition = ?1 AND offset >= ?2 ORDER BY offset ASC LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![FACT_PARTITION, after as i64, limit], |row| {
        let offset: i64 = row.get(0)?;
        let fact_id: String = row.get(1)?;
        let created_at: String = row.get(2)?;
        Ok((offset, fact_id, created_at))
    })?;
    rows.map(|r| {
        let (offset, fact_id, created_at) = r?;
        Ok(FactTopicEntry {
            offset: offset as u64,
            fact_id: FactId::parse(&fact_id)
                .map_err(|e| StoreError::Invalid(format!("fact_topic.fact_id: {e}")))?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StoreError::Invalid(format!("fact_topic.created_at: {e}")))?
                .with_timezone(&Utc),
        })
    })
    .collect()
}

/// Unconsumed `action_topic` entries for `consumer`, in offset order.
pub fn poll_actions(conn: &Connection, consumer: &str, limit: u32) -> Result<Vec<ActionTopicEntry>, StoreError> {
    let after = consumer_offset(conn, ACTION_TOPIC, ACTION_PARTITION, consumer)?;
    let mut stmt = conn.prepare(
        "SELECT offset, action_id, created_at FROM action_topic
         WHERE partition = ?1 AND offset >= ?2 ORDER BY offset ASC LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![ACTION_PARTITION, after as i64, limit], |row| {
        let offset: i64 = row.get(0)?;
        let action_id: String = row.get(1)?;
        let created_at: String = row.get(2)?;
        Ok((offset, action_id, created_at))
    })?;
    rows.map(|r| {
        let (offset, action_id, created_at) = r?;
        Ok(ActionTopicEntry {
            offset: offset as u64,
            action_id: ActionId::parse(&action_id)
                .map_err(|e| StoreError::Invalid(format!("action_topic.action_id: {e}")))?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StoreError::Invalid(format!("action_topic.created_at: {e}")))?
                .with_timezone(&Utc),
        })
    })
    .collect()
}

/// Unconsumed `start_topic` entries for `consumer` across every partition
/// (the Invoker has no reason to shard by Action name), in offset order
/// within each partition.
pub fn poll_starts(conn: &Connection, consumer: &str, limit: u32) -> Result<Vec<StartIntent>, StoreError> {
    let mut stmt = conn.prepare("SELECT DISTINCT partition FROM start_topic")?;
    let partitions: Vec<String> =
        stmt.query_map([], |row| row.get(0))?.collect::<Result<_, _>>()?;

    let mut out = Vec::new();
    for partition in partitions {
        let after = consumer_offset(conn, START_TOPIC, &partition, consumer)?;
        let mut stmt = conn.prepare(
            "SELECT offset, action_id, inputs, created_at FROM start_topic
             WHERE partition = ?1 AND offset >= ?2 ORDER BY offset ASC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![partition, after as i64, limit], |row| {
            let offset: i64 = row.get(0)?;
            let action_id: String = row.get(1)?;
            let inputs: String = row.get(2)?;
            let created_at: String = row.get(3)?;
            Ok((offset, action_id, inputs, created_at))
        })?;
        for row in rows {
            let (offset, action_id, inputs, created_at) = row?;
            out.push(StartIntent {
                offset: offset as u64,
                partition: partition.clone(),
                action_id: ActionId::parse(&action_id)
                    .map_err(|e| StoreError::Invalid(format!("start_topic.action_id: {e}")))?,
                inputs: serde_json::from_str(&inputs)
                    .map_err(|e| StoreError::Invalid(format!("start_topic.inputs: {e}")))?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| StoreError::Invalid(format!("start_topic.created_at: {e}")))?
                    .with_timezone(&Utc),
            });
        }
    }
    Ok(out)
}
