// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job-event consumer (C6, §4.6): follows the external scheduler's
//! event stream and turns terminal allocation updates into Facts.

use crate::error::EngineError;
use cicero_core::{Fact, JobEventRecord, RunId};
use cicero_scheduler::{EventBatch, JobEvent, SchedulerClient};
use cicero_store::{bus, repo, Store, StoreError};
use futures_util::StreamExt;

/// Follow the scheduler's event stream from the persisted offset onward,
/// finalizing terminal Runs as their allocations complete. Runs until the
/// stream ends or a non-retryable error occurs (§5: each iteration is its
/// own transaction, so a crash mid-stream simply resumes from the last
/// persisted offset).
pub async fn run<S: SchedulerClient>(store: &Store, scheduler: &S) -> Result<(), EngineError> {
    let mut offset = store.read(|conn| repo::job_events::get_offset(conn)).await?;
    tracing::info!(resume_at = offset.resume_at(), "job-event consumer starting");

    let mut stream = scheduler.watch();
    while let Some(batch) = stream.next().await {
        let batch = batch?;
        if offset.is_stale(batch.index) {
            tracing::debug!(index = batch.index, "discarding stale job-event batch");
            continue;
        }
        let index = batch.index;
        let to_deregister = process_batch(store, batch).await?;
        offset.advance_to(index);
        for run_id in to_deregister {
            if let Err(error) = scheduler.deregister(run_id, false).await {
                tracing::warn!(%run_id, %error, "deregister after terminal event failed, will retry next pass");
            }
        }
    }
    Ok(())
}

/// Dispatch every terminal `AllocationUpdated` event in `batch` and persist
/// the batch plus the advanced offset, all in one transaction (§4.6). Returns
/// the Run IDs whose job should now be deregistered.
///
/// Exposed (rather than folded entirely into [`run`]'s loop body) so tests
/// and the supervisor's single-batch retry path can drive exactly one batch
/// without standing up a live event stream.
pub async fn process_batch(store: &Store, batch: EventBatch) -> Result<Vec<RunId>, EngineError> {
    let index = batch.index;
    let body = serde_json::to_value(&batch.events).unwrap_or(serde_json::Value::Null);
    let to_deregister = store
        .transaction(move |tx| {
            let mut to_deregister = Vec::new();
            for event in &batch.events {
                let JobEvent::AllocationUpdated { allocation } = event else { continue };
                if !allocation.client_status.is_terminal() {
                    continue;
                }
                let Some(run_id) = allocation.run_id() else { continue };
                match repo::runs::get_by_id(tx, run_id) {
                    Ok(_) => {}
                    Err(StoreError::NotFound) => continue,
                    Err(e) => return Err(e),
                }

                if let Some(output) = repo::run_outputs::get_by_run_id(tx, run_id)? {
                    let value = output.select(allocation.any_task_failed()).clone();
                    let fact = Fact::from_run(run_id, value, allocation.modify_time);
                    repo::facts::save(tx, &fact)?;
                    bus::publish_fact(tx, fact.id, fact.created_at)?;
                    repo::run_outputs::delete(tx, run_id)?;
                }
                repo::runs::finish(tx, run_id, allocation.modify_time)?;
                to_deregister.push(run_id);
            }

            let record = JobEventRecord { index, body: body.clone() };
            repo::job_events::record_and_advance(tx, &record)?;
            Ok(to_deregister)
        })
        .await?;
    Ok(to_deregister)
}
