//! §8 Scenario 4: same as the success path, but one task-state has
//! `failed = true`. Expect the Fact value to be the `failure` template
//! (§9 REDESIGN FLAG: "if any task failed, publish failure; else success").

use super::support::{dispatch_starts, observe_and_match, register_and_catch_up, run_definition, StubEvaluator};
use cicero_core::{Action, FakeClock, Fact, InputMatcher};
use cicero_engine::job_events::process_batch;
use cicero_scheduler::{Allocation, ClientStatus, EventBatch, FakeScheduler, JobEvent, TaskState};
use cicero_store::{repo, Store};

#[tokio::test]
async fn any_failed_task_selects_the_failure_template() {
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

    let batch = EventBatch {
        index: 1,
        events: vec![JobEvent::AllocationUpdated {
            allocation: Allocation {
                job_id: cicero_scheduler::job_name(run_id),
                client_status: ClientStatus::Complete,
                task_states: vec![
                    TaskState { name: "setup".to_string(), failed: false },
                    TaskState { name: "run".to_string(), failed: true },
                ],
                modify_time: clock.now(),
            },
        }],
    };
    process_batch(&store, batch).await.unwrap();

    let facts = store.read(|conn| repo::facts::get_all_newest_first(conn)).await.unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].value, serde_json::json!({"ok": false}));
}
