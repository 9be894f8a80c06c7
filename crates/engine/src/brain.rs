// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Brain (C4, §4.4): two cooperating listeners that re-match runnable
//! Actions against the Fact history and emit Run-start intents.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use cicero_core::{Action, Clock, Fact, FactId};
use cicero_store::{bus, repo, Store};
use std::collections::BTreeMap;

/// Consumer name for the `fact.*` topic (§4.4 "Listen-to-Facts").
pub const FACTS_CONSUMER: &str = "brain-facts";
/// Consumer name for the `action.*` topic (§4.4 "Listen-to-Actions").
pub const ACTIONS_CONSUMER: &str = "brain-actions";

const BATCH_LIMIT: u32 = 256;

/// Drain unconsumed Facts, re-matching every currently-active Action against
/// the whole Fact history (including the newly delivered Fact) for each one,
/// one transaction per Fact (§4.4).
///
/// Returns the number of start intents emitted.
pub async fn listen_to_facts<C: Clock>(store: &Store, clock: &C) -> Result<usize, EngineError> {
    let entries = store.read(|conn| bus::poll_facts(conn, FACTS_CONSUMER, BATCH_LIMIT)).await?;
    let mut emitted = 0;
    for entry in entries {
        let now = clock.now();
        let next_offset = entry.offset + 1;
        emitted += store
            .transaction(move |tx| {
                let actions = repo::actions::get_all_latest(tx)?;
                let count = match_and_emit(tx, &actions, now)?;
                bus::advance_consumer_offset(
                    tx,
                    bus::FACT_TOPIC,
                    bus::FACT_PARTITION,
                    FACTS_CONSUMER,
                    next_offset,
                )?;
                Ok(count)
            })
            .await?;
    }
    Ok(emitted)
}

/// Drain unconsumed Action-registration notifications, re-matching the whole
/// Fact history against just that one newly-registered Action (the catch-up
/// path, §4.4 "Listen-to-Actions").
pub async fn listen_to_actions<C: Clock>(store: &Store, clock: &C) -> Result<usize, EngineError> {
    let entries = store.read(|conn| bus::poll_actions(conn, ACTIONS_CONSUMER, BATCH_LIMIT)).await?;
    let mut emitted = 0;
    for entry in entries {
        let now = clock.now();
        let next_offset = entry.offset + 1;
        emitted += store
            .transaction(move |tx| {
                let action = repo::actions::get_by_id(tx, entry.action_id)?;
                let count = match_and_emit(tx, std::slice::from_ref(&action), now)?;
                bus::advance_consumer_offset(
                    tx,
                    bus::ACTION_TOPIC,
                    bus::ACTION_PARTITION,
                    ACTIONS_CONSUMER,
                    next_offset,
                )?;
                Ok(count)
            })
            .await?;
    }
    Ok(emitted)
}

/// Match `actions` against the full Fact history and emit a start intent for
/// every newly-satisfiable (Action, input-Fact-set) pair not already run
/// (§4.4 dedup key).
fn match_and_emit(
    conn: &rusqlite::Connection,
    actions: &[Action],
    created_at: DateTime<Utc>,
) -> Result<usize, cicero_store::StoreError> {
    let facts = repo::facts::get_all_newest_first(conn)?;
    let mut emitted = 0;
    for action in actions {
        let Some(inputs) = satisfiable_inputs(action, &facts) else { continue };
        let mut fact_ids: Vec<FactId> = inputs.values().copied().collect();
        fact_ids.sort_unstable_by_key(|id| id.as_uuid());
        if repo::runs::exists_with_exact_inputs(conn, action.id, &fact_ids)? {
            continue;
        }
        bus::publish_start(conn, &action.name, action.id, &inputs, created_at)?;
        emitted += 1;
    }
    Ok(emitted)
}

/// The input-name -> chosen-Fact-ID mapping if every required input has a
/// matching Fact; `None` if the Action is not (yet) runnable.
///
/// Optional inputs contribute their newest matching Fact when present but
/// never block satisfiability. When multiple Facts match one input, the
/// newest-created Fact wins (§4.4 tie-break) — `facts` is iterated in
/// newest-first order, so the first match is the right one.
fn satisfiable_inputs(action: &Action, facts: &[Fact]) -> Option<BTreeMap<String, FactId>> {
    let mut inputs = BTreeMap::new();
    for (name, spec) in &action.inputs {
        match facts.iter().find(|f| spec.matcher.matches(&f.value)) {
            Some(fact) => {
                inputs.insert(name.clone(), fact.id);
            }
            None if spec.required => return None,
            None => {}
        }
    }
    Some(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cicero_core::FakeClock;

    async fn register_action(store: &Store, action: &Action) {
        let action = action.clone();
        store
            .transaction(move |tx| {
                repo::actions::save(tx, &action)?;
                bus::publish_action(tx, action.id, action.created_at)
            })
            .await
            .unwrap();
    }

    async fn observe_fact(store: &Store, fact: &Fact) {
        let fact = fact.clone();
        store
            .transaction(move |tx| {
                repo::facts::save(tx, &fact)?;
                bus::publish_fact(tx, fact.id, fact.created_at)
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fires_once_per_satisfying_fact() {
        let store = Store::open_in_memory().unwrap();
        let clock = FakeClock::new();
        let action = Action::test_fixture(
            "build",
            "x",
            cicero_core::InputMatcher::eq("kind", serde_json::json!("k")),
        );
        register_action(&store, &action).await;
        listen_to_actions(&store, &clock).await.unwrap();

        let f1 = Fact::observed(serde_json::json!({"kind": "k", "n": 1}), clock.now());
        observe_fact(&store, &f1).await;
        let emitted = listen_to_facts(&store, &clock).await.unwrap();
        assert_eq!(emitted, 1);

        let starts = store.read(|conn| bus::poll_starts(conn, "test", 10)).await.unwrap();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].inputs.get("x"), Some(&f1.id));

        clock.advance(chrono::Duration::seconds(1));
        let f2 = Fact::observed(serde_json::json!({"kind": "k", "n": 2}), clock.now());
        observe_fact(&store, &f2).await;
        let emitted = listen_to_facts(&store, &clock).await.unwrap();
        assert_eq!(emitted, 1);
    }

    #[tokio::test]
    async fn redelivering_a_fact_after_its_run_exists_emits_nothing() {
        let store = Store::open_in_memory().unwrap();
        let clock = FakeClock::new();
        let created_at = clock.now();
        let action = Action::test_fixture(
            "build",
            "x",
            cicero_core::InputMatcher::eq("kind", serde_json::json!("k")),
        );
        store.transaction({
            let action = action.clone();
            move |tx| repo::actions::save(tx, &action)
        }).await.unwrap();

        let f1 = Fact::observed(serde_json::json!({"kind": "k"}), created_at);
        store.transaction({
            let f1 = f1.clone();
            move |tx| repo::facts::save(tx, &f1)
        }).await.unwrap();

        let first = store
            .transaction({
                let action = action.clone();
                move |tx| match_and_emit(tx, std::slice::from_ref(&action), created_at)
            })
            .await
            .unwrap();
        assert_eq!(first, 1, "the Action is satisfiable and has no Run yet");

        let run = cicero_core::Run::new(
            action.id,
            BTreeMap::from([("x".to_string(), f1.id)]),
            created_at,
        );
        store.transaction(move |tx| repo::runs::save(tx, &run)).await.unwrap();

        let redelivered = store
            .transaction({
                let action = action.clone();
                move |tx| match_and_emit(tx, std::slice::from_ref(&action), created_at)
            })
            .await
            .unwrap();
        assert_eq!(redelivered, 0, "a Run for this exact input set already exists");
    }
}
