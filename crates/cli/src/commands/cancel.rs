// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cicero cancel <run-id>`: operator-initiated Run cancellation (§5, §9
//! "Run cancellation is a first-class store + scheduler operation").
//!
//! Deletes the RunOutput first, then deregisters the job — in that order,
//! so a terminal allocation event racing with the cancel sees no RunOutput
//! and finalizes the Run without publishing a Fact (§5 cancel-race note).

use crate::config::Config;
use cicero_core::RunId;
use cicero_scheduler::{KubernetesScheduler, SchedulerClient};
use cicero_store::{repo, Store};
use tracing::info;

pub async fn run(config: Config, run_id: RunId) -> anyhow::Result<()> {
    let store = Store::open(&config.db_path)?;
    let kube_client = kube::Client::try_default().await?;
    let scheduler = KubernetesScheduler::new(kube_client, config.namespace.clone());

    store
        .transaction(move |tx| {
            repo::runs::get_by_id(tx, run_id)?;
            repo::run_outputs::delete(tx, run_id)?;
            Ok(())
        })
        .await?;

    scheduler.deregister(run_id, false).await?;
    info!(%run_id, "run cancelled");
    Ok(())
}
