// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`SchedulerClient`]: the three external-scheduler operations the engine
//! needs (§6 "External scheduler"), backed by Kubernetes batch Jobs.
//!
//! The "open the event stream at index" operation (§4.3/§4.6) has no direct
//! Kubernetes analogue — `kube::runtime::watcher` resumes from a
//! `resourceVersion` bookmark, not a caller-chosen offset. Rather than fake
//! that resumption, [`KubernetesScheduler::watch`] always streams from the
//! watcher's own start and assigns each delivered batch the next internal
//! index; the job-event consumer's `JobEventOffset::is_stale` check (already
//! required by §4.6 for the "re-sends the last event on resume" case) is
//! what makes re-delivery after a restart harmless, so no K8s-side seek is
//! needed (see `DESIGN.md`).

use crate::error::SchedulerError;
use crate::event::{Allocation, ClientStatus, EventBatch, JobEvent, TaskState};
use crate::job_spec::{job_name, JobSpec, MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use async_trait::async_trait;
use cicero_core::RunId;
use futures_util::{Stream, StreamExt};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, PostParams, PropagationPolicy};
use kube::runtime::{watcher, WatchStreamExt};
use kube::Client;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The three scheduler-boundary operations (§6). Implemented by
/// [`KubernetesScheduler`] in production and `FakeScheduler` in tests
/// (`test-support` feature).
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    /// Submit a job with `run_id` as its job ID (§3: "the external
    /// scheduler's job ID"). Idempotent: resubmitting the same `run_id` is
    /// treated as success (§4.5).
    async fn submit(&self, run_id: RunId, spec: &JobSpec) -> Result<(), SchedulerError>;

    /// Deregister (delete) the job. Idempotent: deregistering an unknown or
    /// already-terminated job is a no-op (§4.6).
    async fn deregister(&self, run_id: RunId, purge: bool) -> Result<(), SchedulerError>;

    /// Open the event stream, yielding batches as they arrive.
    fn watch(&self) -> Pin<Box<dyn Stream<Item = Result<EventBatch, SchedulerError>> + Send>>;
}

/// Kubernetes-backed [`SchedulerClient`]. Jobs are created in `namespace`
/// and labeled so the watch only ever sees Jobs this engine owns.
#[derive(Clone)]
pub struct KubernetesScheduler {
    client: Client,
    namespace: String,
    next_index: Arc<AtomicU64>,
}

impl KubernetesScheduler {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self { client, namespace: namespace.into(), next_index: Arc::new(AtomicU64::new(1)) }
    }

    fn jobs(&self) -> Api<Job> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl SchedulerClient for KubernetesScheduler {
    async fn submit(&self, run_id: RunId, spec: &JobSpec) -> Result<(), SchedulerError> {
        let job = spec.to_k8s_job(run_id, &self.namespace);
        match self.jobs().create(&PostParams::default(), &job).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 409 => {
                tracing::debug!(%run_id, "job already submitted, treating as success");
                Ok(())
            }
            Err(e) => Err(SchedulerError::Kube(e)),
        }
    }

    async fn deregister(&self, run_id: RunId, purge: bool) -> Result<(), SchedulerError> {
        let name = job_name(run_id);
        let propagation =
            if purge { PropagationPolicy::Foreground } else { PropagationPolicy::Background };
        let dp = DeleteParams { propagation_policy: Some(propagation), ..Default::default() };
        match self.jobs().delete(&name, &dp).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(SchedulerError::Kube(e)),
        }
    }

    fn watch(&self) -> Pin<Box<dyn Stream<Item = Result<EventBatch, SchedulerError>> + Send>> {
        let client = self.client.clone();
        let namespace = self.namespace.clone();
        let next_index = Arc::clone(&self.next_index);
        let jobs: Api<Job> = Api::namespaced(client.clone(), &namespace);
        let config = watcher::Config::default()
            .labels(&format!("{MANAGED_BY_LABEL}={MANAGED_BY_VALUE}"));

        let stream = watcher(jobs, config).applied_objects().then(move |job_result| {
            let client = client.clone();
            let namespace = namespace.clone();
            let next_index = Arc::clone(&next_index);
            async move {
                let job = job_result.map_err(|e| SchedulerError::Watch(e.to_string()))?;
                let events = job_to_events(&job, &client, &namespace).await?;
                let index = next_index.fetch_add(1, Ordering::SeqCst);
                Ok(EventBatch { index, events })
            }
        });
        Box::pin(stream)
    }
}

/// Translate one watched Job's current status into the `JobEvent`s §4.6
/// dispatches on. A non-terminal Job produces `JobEvent::Other` (no-op
/// beyond persistence); a terminal one produces `AllocationUpdated`.
async fn job_to_events(
    job: &Job,
    client: &Client,
    namespace: &str,
) -> Result<Vec<JobEvent>, SchedulerError> {
    let Some(name) = job.metadata.name.clone() else {
        return Ok(Vec::new());
    };

    let status = job.status.clone().unwrap_or_default();
    let client_status = if status.succeeded.unwrap_or(0) > 0 {
        ClientStatus::Complete
    } else if status.failed.unwrap_or(0) > 0 {
        ClientStatus::Failed
    } else if status.active.unwrap_or(0) > 0 {
        ClientStatus::Running
    } else {
        ClientStatus::Pending
    };

    if !client_status.is_terminal() {
        return Ok(vec![JobEvent::Other {
            topic: "Job".to_string(),
            body: serde_json::to_value(job).unwrap_or(serde_json::Value::Null),
        }]);
    }

    let task_states = task_states_for_job(client, namespace, &name).await?;
    let modify_time = status
        .completion_time
        .map(|t| t.0)
        .or_else(|| status.start_time.clone().map(|t| t.0))
        .unwrap_or_else(chrono::Utc::now);

    Ok(vec![JobEvent::AllocationUpdated {
        allocation: Allocation { job_id: name, client_status, task_states, modify_time },
    }])
}

async fn task_states_for_job(
    client: &Client,
    namespace: &str,
    job_name: &str,
) -> Result<Vec<TaskState>, SchedulerError> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let lp = ListParams::default().labels(&format!("job-name={job_name}"));
    let list = pods.list(&lp).await?;

    let mut states = Vec::new();
    for pod in list.items {
        let statuses = pod.status.and_then(|s| s.container_statuses).unwrap_or_default();
        for cs in statuses {
            let failed = cs
                .state
                .and_then(|s| s.terminated)
                .map(|t| t.exit_code != 0)
                .unwrap_or(false);
            states.push(TaskState { name: cs.name, failed });
        }
    }
    Ok(states)
}
