//! §8 Scenario 5: "Cancel before terminal event."
//!
//! Operator cancels a live Run (RunOutput deleted, job deregistered). A
//! terminal `AllocationUpdated` for that same Run then arrives. Expect: no
//! new Fact, the Run is still marked finished, and nothing crashes — the
//! same race `cicero cancel` and the job-event consumer resolve via the
//! RunOutput's absence (§5).

use super::support::{dispatch_starts, observe_and_match, register_and_catch_up, run_definition, StubEvaluator};
use cicero_core::{Action, FakeClock, Fact, InputMatcher};
use cicero_engine::job_events::process_batch;
use cicero_scheduler::{Allocation, ClientStatus, EventBatch, FakeScheduler, JobEvent, SchedulerClient, TaskState};
use cicero_store::{repo, Store};

#[tokio::test]
async fn cancel_then_terminal_event_produces_no_fact() {
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
    observe_and_match(&store, &f1, &clock).await;
    dispatch_starts(&store, &evaluator, &scheduler, &clock).await;

    let runs = store.read(move |conn| repo::runs::get_by_action_id(conn, action.id)).await.unwrap();
    let run_id = runs[0].id;

    // `cicero cancel <run-id>`: delete the RunOutput, then deregister.
    store.transaction(move |tx| repo::run_outputs::delete(tx, run_id).map(|_| ())).await.unwrap();
    scheduler.deregister(run_id, false).await.unwrap();

    let batch = EventBatch {
        index: 1,
        events: vec![JobEvent::AllocationUpdated {
            allocation: Allocation {
                job_id: cicero_scheduler::job_name(run_id),
                client_status: ClientStatus::Complete,
                task_states: vec![TaskState { name: "run".to_string(), failed: false }],
                modify_time: clock.now(),
            },
        }],
    };
    let to_deregister = process_batch(&store, batch).await.unwrap();
    assert_eq!(to_deregister, vec![run_id], "the Run still gets finalized");

    let facts = store.read(|conn| repo::facts::get_all_newest_first(conn)).await.unwrap();
    assert!(facts.is_empty(), "cancellation suppresses the terminal Fact");

    let run = store.read(move |conn| repo::runs::get_by_id(conn, run_id)).await.unwrap();
    assert!(run.is_terminal(), "finalization still happens even without a Fact");
}
