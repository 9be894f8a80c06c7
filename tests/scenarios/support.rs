//! Shared scaffolding for the engine-level specs: an in-memory store, a
//! stub [`Evaluator`] returning a fixed [`RunDefinition`], and a couple of
//! one-transaction helpers for seeding Actions/Facts the way the Brain and
//! Invoker themselves would produce them.

use async_trait::async_trait;
use cicero_core::{Action, ActionId, Fact};
use cicero_engine::{brain, invoker};
use cicero_eval::{ActionDefinition, EvalError, Evaluator, RunDefinition};
use cicero_scheduler::FakeScheduler;
use cicero_store::{bus, repo, Store};

/// Always returns the same [`RunDefinition`] for `evaluate_run`, regardless
/// of the inputs it's handed — the scenarios in §8 only care about what the
/// Invoker does with the result, not about evaluation logic itself (that's
/// `cicero-eval`'s own test suite).
pub struct StubEvaluator {
    pub run_definition: RunDefinition,
}

#[async_trait]
impl Evaluator for StubEvaluator {
    async fn list(&self, _src: &str) -> Result<Vec<String>, EvalError> {
        Ok(vec![])
    }

    async fn evaluate_action(
        &self,
        _src: &str,
        _name: &str,
        _id: ActionId,
    ) -> Result<ActionDefinition, EvalError> {
        Ok(ActionDefinition { meta: serde_json::Value::Null, inputs: Default::default() })
    }

    async fn evaluate_run(
        &self,
        _src: &str,
        _name: &str,
        _id: ActionId,
        _inputs: &serde_json::Value,
    ) -> Result<RunDefinition, EvalError> {
        Ok(self.run_definition.clone())
    }
}

pub fn run_definition(success: serde_json::Value, failure: serde_json::Value) -> RunDefinition {
    RunDefinition {
        success,
        failure,
        job: serde_json::json!({"image": "busybox", "command": [], "args": [], "env": {}}),
    }
}

/// Register `action`, including the `action.*` notification the Brain's
/// "Listen-to-Actions" loop consumes (§4.4).
pub async fn register_action(store: &Store, action: &Action) {
    let action = action.clone();
    store
        .transaction(move |tx| {
            repo::actions::save(tx, &action)?;
            bus::publish_action(tx, action.id, action.created_at)?;
            Ok(())
        })
        .await
        .unwrap();
}

/// Accept `fact`, including the `fact.*` publication every acceptance
/// produces (§3 invariant: "Each insertion is also published on the log
/// bus' fact topic").
pub async fn observe_fact(store: &Store, fact: &Fact) {
    let fact = fact.clone();
    store
        .transaction(move |tx| {
            repo::facts::save(tx, &fact)?;
            bus::publish_fact(tx, fact.id, fact.created_at)?;
            Ok(())
        })
        .await
        .unwrap();
}

/// Register `action` and immediately drain "Listen-to-Actions" against it
/// (§4.4's catch-up path), before any Fact this test cares about exists.
/// Keeping this separate from [`observe_and_match`] below mirrors how the
/// two listeners are independent consumers in production: each drains its
/// own topic promptly, so there is no window where both an unconsumed
/// Action-registration and an unconsumed Fact describe the same still-Run-less
/// match at once.
pub async fn register_and_catch_up<C: cicero_core::Clock>(store: &Store, action: &Action, clock: &C) {
    register_action(store, action).await;
    brain::listen_to_actions(store, clock).await.unwrap();
}

/// Accept `fact` and drain "Listen-to-Facts" once. Returns the number of
/// start intents emitted.
pub async fn observe_and_match<C: cicero_core::Clock>(store: &Store, fact: &Fact, clock: &C) -> usize {
    observe_fact(store, fact).await;
    brain::listen_to_facts(store, clock).await.unwrap()
}

/// Drain the Invoker once, dispatching any pending start intents to
/// `scheduler` via `evaluator`.
pub async fn dispatch_starts<C: cicero_core::Clock>(
    store: &Store,
    evaluator: &StubEvaluator,
    scheduler: &FakeScheduler,
    clock: &C,
) -> usize {
    invoker::listen_to_starts(store, evaluator, scheduler, clock).await.unwrap()
}
