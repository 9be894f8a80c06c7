//! §8 Scenario 2: "Duplicate fact delivery is idempotent."
//!
//! The Brain's dedup key is `(action_id, sorted input-Fact-IDs)` (§4.4): once
//! a Run exists for an Action with an exact input-Fact set, re-matching that
//! Action against the same Fact history — as "Listen-to-Actions" does for a
//! redelivered registration, or a crash-restart replaying an earlier offset
//! would — must not emit a second start intent.

use super::support::{dispatch_starts, observe_and_match, register_and_catch_up, run_definition, StubEvaluator};
use cicero_core::{Action, FakeClock, Fact, InputMatcher};
use cicero_scheduler::FakeScheduler;
use cicero_store::{bus, repo, Store};
use std::collections::BTreeMap;

#[tokio::test]
async fn redelivering_the_action_registration_emits_nothing_new() {
    let store = Store::open_in_memory().unwrap();
    let clock = FakeClock::new();
    let scheduler = FakeScheduler::new();
    let evaluator = StubEvaluator {
        run_definition: run_definition(serde_json::json!({"ok": true}), serde_json::json!({"ok": false})),
    };

    let action =
        Action::test_fixture("build", "x", InputMatcher::eq("kind", serde_json::json!("k")));
    register_and_catch_up(&store, &action, &clock).await;

    let f1 = Fact::observed(serde_json::json!({"kind": "k"}), clock.now());
    let emitted = observe_and_match(&store, &f1, &clock).await;
    assert_eq!(emitted, 1);

    // The Invoker must actually persist the Run before dedup has anything
    // to check against (§4.4's dedup key lives on the Runs table).
    let processed = dispatch_starts(&store, &evaluator, &scheduler, &clock).await;
    assert_eq!(processed, 1);

    // Simulate the Action being redelivered on the `action.*` topic: a
    // restart replaying "Listen-to-Actions" from an earlier offset, or a
    // duplicate registration notification. Re-matching the entire Fact
    // history against it must not emit a second intent.
    let action_id = action.id;
    let created_at = action.created_at;
    store.transaction(move |tx| bus::publish_action(tx, action_id, created_at)).await.unwrap();
    let redelivered = cicero_engine::brain::listen_to_actions(&store, &clock).await.unwrap();
    assert_eq!(redelivered, 0, "a Run for this exact input set already exists");

    let runs = store.read(move |conn| repo::runs::get_by_action_id(conn, action.id)).await.unwrap();
    assert_eq!(runs.len(), 1);
    let mut expected = BTreeMap::new();
    expected.insert("x".to_string(), f1.id);
    assert_eq!(runs[0].inputs, expected);
}
