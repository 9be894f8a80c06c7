// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluation error kinds (§4.3 step 5: "wrap the failure as an
//! EvaluationError carrying stdout and stderr").

use thiserror::Error;

/// An evaluator or transformer exited non-zero, or otherwise produced
/// unusable output. Distinguished from infrastructure errors so the Invoker
//  can turn it into a failure Fact instead of retrying forever (§7).
#[derive(Debug, Error)]
#[error("{program} exited with status {exit_code:?}: {}", String::from_utf8_lossy(stderr))]
pub struct EvaluationError {
    pub program: String,
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("all evaluators failed: {}", summarize(.0))]
    AllEvaluatorsFailed(Vec<(String, EvaluationError)>),

    #[error("could not decode evaluator output: {0}")]
    Decode(String),

    #[error("http fetch error: {0}")]
    Http(#[from] reqwest::Error),
}

fn summarize(failures: &[(String, EvaluationError)]) -> String {
    failures.iter().map(|(name, e)| format!("{name}: {e}")).collect::<Vec<_>>().join("; ")
}
