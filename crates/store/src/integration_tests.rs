use crate::{bus, repo, Store};
use cicero_core::{Action, ActionId, Fact, InputMatcher, RunOutput};
use chrono::Utc;
use std::collections::BTreeMap;

fn test_store() -> Store {
    Store::open_in_memory().expect("open in-memory store")
}

#[tokio::test]
async fn fact_save_and_publish_round_trip() {
    let store = test_store();
    let fact = Fact::observed(serde_json::json!({"kind": "k", "n": 1}), Utc::now());
    let fact_id = fact.id;
    store
        .transaction(move |tx| {
            repo::facts::save(tx, &fact)?;
            bus::publish_fact(tx, fact.id, fact.created_at)?;
            Ok(())
        })
        .await
        .unwrap();

    let loaded = store.read(move |conn| repo::facts::get_by_id(conn, fact_id)).await.unwrap();
    assert_eq!(loaded.id, fact_id);

    let polled = store.read(|conn| bus::poll_facts(conn, "brain", 10)).await.unwrap();
    assert_eq!(polled.len(), 1);
    assert_eq!(polled[0].fact_id, fact_id);
}

#[tokio::test]
async fn dedup_check_matches_exact_input_set() {
    let store = test_store();
    let action = Action::test_fixture("build", "x", InputMatcher::exists("kind"));
    let action_id = action.id;
    let fact_id = cicero_core::FactId::new();
    let mut inputs = BTreeMap::new();
    inputs.insert("x".to_string(), fact_id);
    let run = cicero_core::Run::new(action_id, inputs, Utc::now());

    store
        .transaction(move |tx| {
            repo::actions::save(tx, &action)?;
            repo::runs::save(tx, &run)?;
            Ok(())
        })
        .await
        .unwrap();

    let exists = store
        .read(move |conn| repo::runs::exists_with_exact_inputs(conn, action_id, &[fact_id]))
        .await
        .unwrap();
    assert!(exists, "a Run with this exact input set should be deduped");

    let other_fact = cicero_core::FactId::new();
    let exists_other = store
        .read(move |conn| repo::runs::exists_with_exact_inputs(conn, action_id, &[other_fact]))
        .await
        .unwrap();
    assert!(!exists_other);
}

#[tokio::test]
async fn get_latest_by_action_id_picks_the_newest_run() {
    let store = test_store();
    let action = Action::test_fixture("build", "x", InputMatcher::exists("kind"));
    let action_id = action.id;
    let older = cicero_core::Run::new(action_id, BTreeMap::new(), Utc::now());
    let newer = cicero_core::Run::new(
        action_id,
        BTreeMap::new(),
        Utc::now() + chrono::Duration::seconds(1),
    );
    let newer_id = newer.id;

    store
        .transaction(move |tx| {
            repo::actions::save(tx, &action)?;
            repo::runs::save(tx, &older)?;
            repo::runs::save(tx, &newer)?;
            Ok(())
        })
        .await
        .unwrap();

    let latest =
        store.read(move |conn| repo::runs::get_latest_by_action_id(conn, action_id)).await.unwrap();
    assert_eq!(latest.id, newer_id);
}

#[tokio::test]
async fn run_output_presence_signals_liveness() {
    let store = test_store();
    let action_id = ActionId::new();
    let run = cicero_core::Run::new(action_id, BTreeMap::new(), Utc::now());
    let run_id = run.id;
    let output = RunOutput::new(run_id, serde_json::json!({"ok": true}), serde_json::json!({"ok": false}));

    store
        .transaction(move |tx| {
            repo::runs::save(tx, &run)?;
            repo::run_outputs::save(tx, &output)?;
            Ok(())
        })
        .await
        .unwrap();

    let live = store.read(move |conn| repo::run_outputs::get_by_run_id(conn, run_id)).await.unwrap();
    assert!(live.is_some());

    let deleted = store.read(move |conn| repo::run_outputs::delete(conn, run_id)).await.unwrap();
    assert!(deleted, "first delete removes the live row");

    let deleted_again = store.read(move |conn| repo::run_outputs::delete(conn, run_id)).await.unwrap();
    assert!(!deleted_again, "second delete is a no-op, as a concurrent cancel+terminal-event race requires");
}

#[tokio::test]
async fn job_event_offset_rejects_regression() {
    let store = test_store();
    store
        .transaction(|tx| {
            repo::job_events::record_and_advance(
                tx,
                &cicero_core::JobEventRecord { index: 5, body: serde_json::json!({}) },
            )
        })
        .await
        .unwrap();

    let result = store
        .transaction(|tx| {
            repo::job_events::record_and_advance(
                tx,
                &cicero_core::JobEventRecord { index: 3, body: serde_json::json!({}) },
            )
        })
        .await;
    assert!(result.is_err());
}
