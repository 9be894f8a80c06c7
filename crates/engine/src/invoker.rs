// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Invoker (C5, §4.5): consumes Run-start intents, evaluates the run
//! definition, persists the Run, and dispatches the job to the external
//! scheduler.

use crate::error::EngineError;
use cicero_core::{Clock, Fact, Run, RunOutput};
use cicero_eval::Evaluator;
use cicero_scheduler::SchedulerClient;
use cicero_store::{bus, bus::StartIntent, repo, Store};

pub const CONSUMER: &str = "invoker";

const BATCH_LIMIT: u32 = 256;

/// Drain unconsumed start intents (§4.5). Each intent is evaluated before any
/// transaction is opened (§5: "no task holds database transactions across
/// subprocess execution"); persisting the Run/RunOutput and submitting to the
/// scheduler are then sequenced so that a crash between them is safe to retry
/// (see `DESIGN.md` for how this composes without literally nesting the
/// scheduler call inside the SQLite transaction).
pub async fn listen_to_starts<C, E, S>(
    store: &Store,
    evaluator: &E,
    scheduler: &S,
    clock: &C,
) -> Result<usize, EngineError>
where
    C: Clock,
    E: Evaluator,
    S: SchedulerClient,
{
    let intents = store.read(|conn| bus::poll_starts(conn, CONSUMER, BATCH_LIMIT)).await?;
    let mut processed = 0;
    for intent in intents {
        process_intent(store, evaluator, scheduler, clock, &intent).await?;
        processed += 1;
    }
    Ok(processed)
}

async fn process_intent<C, E, S>(
    store: &Store,
    evaluator: &E,
    scheduler: &S,
    clock: &C,
    intent: &StartIntent,
) -> Result<(), EngineError>
where
    C: Clock,
    E: Evaluator,
    S: SchedulerClient,
{
    let action = store.read({
        let action_id = intent.action_id;
        move |conn| repo::actions::get_by_id(conn, action_id)
    }).await?;
    let next_offset = intent.offset + 1;
    let inputs_value = resolve_inputs(store, &intent.inputs).await?;

    let run_def =
        match evaluator.evaluate_run(&action.source, &action.name, action.id, &inputs_value).await {
            Ok(def) => def,
            Err(cicero_eval::EvalError::Evaluation(e)) => {
                return acknowledge_evaluation_failure(store, intent, next_offset, clock, &e.to_string()).await;
            }
            Err(cicero_eval::EvalError::AllEvaluatorsFailed(failures)) => {
                let message = failures.iter().map(|(n, e)| format!("{n}: {e}")).collect::<Vec<_>>().join("; ");
                return acknowledge_evaluation_failure(store, intent, next_offset, clock, &message).await;
            }
            Err(other) => return Err(other.into()),
        };

    // Decode the freeform `job` field before persisting anything: a malformed
    // job spec is a faulty Action definition (§4.5/§7), not infrastructure
    // trouble, so it must be acknowledged with a failure Fact rather than
    // leave an orphaned "live" RunOutput behind for `poll_loop` to retry
    // forever.
    let job_spec = match run_def.job_spec() {
        Ok(spec) => spec,
        Err(e) => {
            return acknowledge_evaluation_failure(store, intent, next_offset, clock, &e.to_string()).await;
        }
    };

    let now = clock.now();
    let action_id = intent.action_id;
    let inputs = intent.inputs.clone();
    let existing = store
        .read(move |conn| repo::runs::get_by_action_id(conn, action_id))
        .await?
        .into_iter()
        .find(|r| r.inputs == inputs);

    let run_id = match existing {
        Some(run) => run.id,
        None => {
            let run = Run::new(intent.action_id, intent.inputs.clone(), now);
            let run_id = run.id;
            let output = RunOutput::new(run_id, run_def.success.clone(), run_def.failure.clone());
            store
                .transaction(move |tx| {
                    repo::runs::save(tx, &run)?;
                    repo::run_outputs::save(tx, &output)
                })
                .await?;
            run_id
        }
    };

    scheduler.submit(run_id, &job_spec).await?;

    let partition = intent.partition.clone();
    store
        .transaction(move |tx| {
            bus::advance_consumer_offset(tx, bus::START_TOPIC, &partition, CONSUMER, next_offset)
        })
        .await?;
    Ok(())
}

/// §4.5 failure policy: an *EvaluationError* means a faulty Action
/// definition, not infrastructure trouble — acknowledge the intent and
/// publish a failure Fact so the dataflow can react, instead of retrying
/// forever (§7).
async fn acknowledge_evaluation_failure<C: Clock>(
    store: &Store,
    intent: &StartIntent,
    next_offset: u64,
    clock: &C,
    message: &str,
) -> Result<(), EngineError> {
    let now = clock.now();
    let value = serde_json::json!({ "error": message });
    let partition = intent.partition.clone();
    store
        .transaction(move |tx| {
            let fact = Fact::observed(value, now);
            repo::facts::save(tx, &fact)?;
            bus::publish_fact(tx, fact.id, fact.created_at)?;
            bus::advance_consumer_offset(tx, bus::START_TOPIC, &partition, CONSUMER, next_offset)
        })
        .await?;
    Ok(())
}

async fn resolve_inputs(
    store: &Store,
    inputs: &std::collections::BTreeMap<String, cicero_core::FactId>,
) -> Result<serde_json::Value, EngineError> {
    let inputs = inputs.clone();
    let value = store
        .read(move |conn| {
            let mut map = serde_json::Map::new();
            for (name, fact_id) in &inputs {
                let fact = repo::facts::get_by_id(conn, *fact_id)?;
                map.insert(name.clone(), fact.value);
            }
            Ok(serde_json::Value::Object(map))
        })
        .await?;
    Ok(value)
}
