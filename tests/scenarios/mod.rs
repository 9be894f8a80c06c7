mod support;

mod action_fires_once;
mod cancel_before_terminal_event;
mod duplicate_fact_is_idempotent;
mod failure_path;
mod success_path;
