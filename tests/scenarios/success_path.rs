//! §8 Scenario 3: "Success path."
//!
//! Invoker receives a start intent, evaluates it (stub evaluator returning
//! `{success, failure, job}`), persists the Run, and submits the job. The
//! external scheduler then reports a terminal `AllocationUpdated` with
//! client-status `complete` and no failed tasks. Expect: one Fact with
//! `{ok: true}` and `run-id` set to the Run, `finished_at` set, the
//! RunOutput deleted, and a deregister call made.

use super::support::{dispatch_starts, observe_and_match, register_and_catch_up, run_definition, StubEvaluator};
use cicero_core::{Action, FakeClock, Fact, InputMatcher};
use cicero_engine::job_events::process_batch;
use cicero_scheduler::{Allocation, ClientStatus, EventBatch, FakeScheduler, JobEvent, SchedulerClient, TaskState};
use cicero_store::{repo, Store};

#[tokio::test]
async fn terminal_success_allocation_publishes_fact_and_finalizes_run() {
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
    assert_eq!(runs.len(), 1);
    let run_id = runs[0].id;
    assert!(scheduler.is_submitted(run_id));

    let modify_time = clock.now();
    let batch = EventBatch {
        index: 1,
        events: vec![JobEvent::AllocationUpdated {
            allocation: Allocation {
                job_id: cicero_scheduler::job_name(run_id),
                client_status: ClientStatus::Complete,
                task_states: vec![TaskState { name: "run".to_string(), failed: false }],
                modify_time,
            },
        }],
    };
    let to_deregister = process_batch(&store, batch).await.unwrap();
    assert_eq!(to_deregister, vec![run_id]);
    for run in &to_deregister {
        scheduler.deregister(*run, false).await.unwrap();
    }

    let facts = store.read(|conn| repo::facts::get_all_newest_first(conn)).await.unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].value, serde_json::json!({"ok": true}));
    assert_eq!(facts[0].run_id, Some(run_id));

    let run = store.read(move |conn| repo::runs::get_by_id(conn, run_id)).await.unwrap();
    assert_eq!(run.finished_at, Some(modify_time));

    let output = store.read(move |conn| repo::run_outputs::get_by_run_id(conn, run_id)).await.unwrap();
    assert!(output.is_none(), "RunOutput is deleted once the Run is finalized");

    assert_eq!(scheduler.deregister_count(run_id), 1);
}
