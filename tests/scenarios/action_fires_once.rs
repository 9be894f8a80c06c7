//! §8 Scenario 1: "Action with one required input fires once."
//!
//! Register an Action with one required input matching `.kind == "k"`.
//! Each Fact satisfying it should produce exactly one start intent carrying
//! that Fact's ID, and a second satisfying Fact should produce a second,
//! distinct intent.

use super::support::{observe_and_match, register_and_catch_up};
use cicero_core::{Action, FakeClock, Fact, InputMatcher};
use cicero_store::{bus, Store};

#[tokio::test]
async fn fires_once_per_satisfying_fact() {
    let store = Store::open_in_memory().unwrap();
    let clock = FakeClock::new();

    let action =
        Action::test_fixture("build", "x", InputMatcher::eq("kind", serde_json::json!("k")));
    register_and_catch_up(&store, &action, &clock).await;

    let f1 = Fact::observed(serde_json::json!({"kind": "k", "n": 1}), clock.now());
    let emitted = observe_and_match(&store, &f1, &clock).await;
    assert_eq!(emitted, 1);

    let starts = store.read(|conn| bus::poll_starts(conn, "watcher", 10)).await.unwrap();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].inputs.get("x"), Some(&f1.id));

    clock.advance(chrono::Duration::seconds(1));
    let f2 = Fact::observed(serde_json::json!({"kind": "k", "n": 2}), clock.now());
    let emitted = observe_and_match(&store, &f2, &clock).await;
    assert_eq!(emitted, 1, "a second satisfying fact produces a second intent");

    let starts = store.read(|conn| bus::poll_starts(conn, "watcher", 10)).await.unwrap();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[1].inputs.get("x"), Some(&f2.id));
}
