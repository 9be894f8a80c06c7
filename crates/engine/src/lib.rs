// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciliation engine: the Brain (C4), Invoker (C5), and job-event
//! consumer (C6) that turn Facts into Run-start intents, Run-start intents
//! into scheduled jobs, and terminal job events back into Facts — plus the
//! supervisor that runs all three as restartable tasks.
//!
//! Every entity mutation goes through [`cicero_store::Store::transaction`];
//! every loop here is a thin, generic-over-`Clock` function so tests can
//! drive it with [`cicero_core::FakeClock`] and a [`cicero_store::Store`]
//! opened in memory.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod brain;
mod error;
pub mod invoker;
pub mod job_events;
pub mod supervisor;

pub use error::EngineError;
pub use supervisor::{poll_loop, run as run_supervised, RestartBudget, SupervisedTask};
