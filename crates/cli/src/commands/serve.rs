// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cicero serve`: run the Brain, Invoker, and job-event consumer until the
//! process receives a shutdown signal.

use crate::config::Config;
use cicero_core::SystemClock;
use cicero_engine::{brain, invoker, job_events, poll_loop, run_supervised, RestartBudget, SupervisedTask};
use cicero_eval::{EvalConfig, ProcessEvaluator};
use cicero_scheduler::KubernetesScheduler;
use cicero_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = Store::open(&config.db_path)?;
    let clock = SystemClock;

    let kube_client = kube::Client::try_default().await?;
    let scheduler = Arc::new(KubernetesScheduler::new(kube_client, config.namespace.clone()));

    let eval_config = EvalConfig {
        cache_root: EvalConfig::cache_root_from_env(),
        default_evaluators: config.default_evaluators.clone(),
        transformers: config.transformers.clone(),
    };
    let evaluator =
        Arc::new(ProcessEvaluator::new(eval_config.cache_root, eval_config.default_evaluators, eval_config.transformers));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.cancel();
        }
    });

    let brain_facts = {
        let store = store.clone();
        let clock = clock;
        let shutdown = shutdown.clone();
        SupervisedTask::new("brain-facts", move || {
            let store = store.clone();
            let shutdown = shutdown.clone();
            async move {
                poll_loop("brain-facts", POLL_INTERVAL, shutdown, || brain::listen_to_facts(&store, &clock)).await
            }
        })
    };

    let brain_actions = {
        let store = store.clone();
        let clock = clock;
        let shutdown = shutdown.clone();
        SupervisedTask::new("brain-actions", move || {
            let store = store.clone();
            let shutdown = shutdown.clone();
            async move {
                poll_loop("brain-actions", POLL_INTERVAL, shutdown, || brain::listen_to_actions(&store, &clock)).await
            }
        })
    };

    let invoker_task = {
        let store = store.clone();
        let evaluator = Arc::clone(&evaluator);
        let scheduler = Arc::clone(&scheduler);
        let clock = clock;
        let shutdown = shutdown.clone();
        SupervisedTask::new("invoker", move || {
            let store = store.clone();
            let evaluator = Arc::clone(&evaluator);
            let scheduler = Arc::clone(&scheduler);
            let shutdown = shutdown.clone();
            async move {
                poll_loop("invoker", POLL_INTERVAL, shutdown, || {
                    invoker::listen_to_starts(&store, evaluator.as_ref(), scheduler.as_ref(), &clock)
                })
                .await
            }
        })
    };

    let job_event_task = {
        let store = store.clone();
        let scheduler = Arc::clone(&scheduler);
        SupervisedTask::new("job-events", move || {
            let store = store.clone();
            let scheduler = Arc::clone(&scheduler);
            async move { job_events::run(&store, scheduler.as_ref()).await }
        })
    };

    info!(namespace = %config.namespace, db = %config.db_path.display(), "cicero serving");
    run_supervised(
        vec![brain_facts, brain_actions, invoker_task, job_event_task],
        RestartBudget::default(),
        shutdown,
    )
    .await;
    Ok(())
}
