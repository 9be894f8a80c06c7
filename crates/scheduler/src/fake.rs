// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `FakeScheduler`: an in-memory [`SchedulerClient`] for engine tests, mirroring
//! `oj-adapters`' fake-adapter convention (gated behind `test-support`).

use crate::client::SchedulerClient;
use crate::error::SchedulerError;
use crate::event::EventBatch;
use crate::job_spec::{job_name, JobSpec};
use async_trait::async_trait;
use cicero_core::RunId;
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Records every submitted/deregistered job and lets tests push synthetic
/// event batches onto the watch stream (scenario 3-6 in §8).
#[derive(Clone)]
pub struct FakeScheduler {
    submitted: Arc<Mutex<HashSet<String>>>,
    deregistered: Arc<Mutex<Vec<(String, bool)>>>,
    events_tx: broadcast::Sender<Result<EventBatch, String>>,
}

impl Default for FakeScheduler {
    fn default() -> Self {
        let (events_tx, _) = broadcast::channel(1024);
        Self {
            submitted: Arc::new(Mutex::new(HashSet::new())),
            deregistered: Arc::new(Mutex::new(Vec::new())),
            events_tx,
        }
    }
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_submitted(&self, run_id: RunId) -> bool {
        self.submitted.lock().contains(&job_name(run_id))
    }

    pub fn deregister_count(&self, run_id: RunId) -> usize {
        let name = job_name(run_id);
        self.deregistered.lock().iter().filter(|(n, _)| n == &name).count()
    }

    /// Push a batch directly onto the watch stream, as if the scheduler had
    /// emitted it.
    pub fn push_event(&self, batch: EventBatch) {
        let _ = self.events_tx.send(Ok(batch));
    }
}

#[async_trait]
impl SchedulerClient for FakeScheduler {
    async fn submit(&self, run_id: RunId, _spec: &JobSpec) -> Result<(), SchedulerError> {
        self.submitted.lock().insert(job_name(run_id));
        Ok(())
    }

    async fn deregister(&self, run_id: RunId, purge: bool) -> Result<(), SchedulerError> {
        self.deregistered.lock().push((job_name(run_id), purge));
        Ok(())
    }

    fn watch(&self) -> Pin<Box<dyn Stream<Item = Result<EventBatch, SchedulerError>> + Send>> {
        let rx = self.events_tx.subscribe();
        let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(|item| async {
            match item {
                Ok(Ok(batch)) => Some(Ok(batch)),
                Ok(Err(e)) => Some(Err(SchedulerError::Watch(e))),
                Err(_lagged) => None,
            }
        });
        Box::pin(stream)
    }
}
