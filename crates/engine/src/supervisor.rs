// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs the Brain/Invoker/job-event-consumer loops as independently
//! restartable tasks (§7: "the supervisor restarts a failed task with
//! backoff; a task that exceeds its restart budget shuts the process down
//! for operator intervention").

use crate::error::EngineError;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How many restarts a task may use up within `window` before the
/// supervisor gives up on it.
#[derive(Debug, Clone, Copy)]
pub struct RestartBudget {
    pub max_restarts: u32,
    pub window: Duration,
}

impl Default for RestartBudget {
    /// Five restarts a minute, mirroring a typical one-for-one Erlang-style
    /// supervisor budget — generous enough to ride out a transient k8s API
    /// hiccup, tight enough to notice a crash loop quickly.
    fn default() -> Self {
        Self { max_restarts: 5, window: Duration::from_secs(60) }
    }
}

type TaskFuture = Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send>>;

/// One supervised loop: a name for logging, and a factory that produces a
/// fresh attempt each time the supervisor (re)starts it.
pub struct SupervisedTask {
    name: String,
    factory: Box<dyn Fn() -> TaskFuture + Send + Sync>,
}

impl SupervisedTask {
    pub fn new<F, Fut>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EngineError>> + Send + 'static,
    {
        Self { name: name.into(), factory: Box::new(move || Box::pin(factory())) }
    }
}

/// Run every task concurrently until `shutdown` fires or every task has
/// stopped (cleanly, fatally, or by exhausting its restart budget).
pub async fn run(tasks: Vec<SupervisedTask>, budget: RestartBudget, shutdown: CancellationToken) {
    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move { supervise_one(task, budget, shutdown).await }));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

async fn supervise_one(task: SupervisedTask, budget: RestartBudget, shutdown: CancellationToken) {
    let mut restarts_in_window: u32 = 0;
    let mut window_start = tokio::time::Instant::now();

    loop {
        let attempt = tokio::select! {
            _ = shutdown.cancelled() => {
                info!(task = %task.name, "shutting down");
                return;
            }
            result = (task.factory)() => result,
        };

        match attempt {
            Ok(()) => {
                info!(task = %task.name, "loop exited cleanly");
                return;
            }
            Err(e) if e.is_fatal() => {
                error!(task = %task.name, error = %e, "fatal error, not restarting");
                shutdown.cancel();
                return;
            }
            Err(e) => {
                if window_start.elapsed() > budget.window {
                    window_start = tokio::time::Instant::now();
                    restarts_in_window = 0;
                }
                restarts_in_window += 1;
                if restarts_in_window > budget.max_restarts {
                    error!(
                        task = %task.name,
                        max_restarts = budget.max_restarts,
                        window_secs = budget.window.as_secs(),
                        "exceeded restart budget, giving up"
                    );
                    shutdown.cancel();
                    return;
                }
                warn!(task = %task.name, error = %e, restart = restarts_in_window, "task failed, restarting");
            }
        }
    }
}

/// Wrap a one-shot "drain whatever's pending" call (the Brain and Invoker's
/// shape) into a loop that ticks every `interval` until `shutdown` fires.
pub async fn poll_loop<F, Fut>(
    name: &str,
    interval: Duration,
    shutdown: CancellationToken,
    mut tick: F,
) -> Result<(), EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<usize, EngineError>>,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            _ = tokio::time::sleep(interval) => {}
        }
        let processed = tick().await?;
        if processed > 0 {
            tracing::debug!(task = name, processed, "drained pending entries");
        }
    }
}
