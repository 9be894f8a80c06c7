// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The SQLite connection handle shared by every repository and the log bus.
//!
//! "Ambient transactional querier" (§4.1, §9): repositories take
//! `&rusqlite::Connection`, and `rusqlite::Transaction` derefs to
//! `Connection`, so a repository written against a plain connection works
//! unchanged against an open transaction — the same function composes into
//! any caller's atomic unit of work. [`Store::transaction`] is the only
//! place that opens one.

use crate::error::StoreError;
use crate::schema;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::{Arc, Mutex};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// A handle to the reconciliation database.
///
/// Cheap to clone: the underlying connection is shared behind a mutex, the
/// same way `oj_adapters`' notifier and the decision-gate SQLite store share
/// a single connection across async callers.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Invalid(format!("cannot create {parent:?}: {e}")))?;
            }
        }
        let mut conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(std::time::Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
        schema::initialize(&mut conn)?;
        Ok(Store { conn: Arc::new(Mutex::new(conn)) })
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        schema::initialize(&mut conn)?;
        Ok(Store { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Run `f` inside one SQLite transaction on the blocking thread pool,
    /// committing iff `f` returns `Ok`.
    ///
    /// Every multi-entity write in `cicero-engine` goes through this: the
    /// Brain's match-and-publish, the Invoker's evaluate-persist-submit, and
    /// the job-event consumer's publish-finalize-advance-offset all run as a
    /// single call here (§5: "No task holds database transactions across
    /// subprocess execution — evaluation happens before the transaction is
    /// opened").
    pub async fn transaction<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let tx = guard.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;
            Ok(result)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Run `f` against a plain (non-transactional) connection, for reads
    /// that don't need atomicity with anything else.
    pub async fn read<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
