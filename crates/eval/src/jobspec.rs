// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-spec decoding (§4.3 step 6): the evaluator's freeform `job` JSON is
//! escaped and parsed as HCL into a [`cicero_scheduler::JobSpec`], the same
//! `hcl::from_str::<T>(text)` direct-deserialize shape the teacher uses for
//! runbook containers.

use crate::error::EvalError;
use cicero_scheduler::JobSpec;
use serde::Deserialize;

#[derive(Deserialize)]
struct WrappedJob {
    job: JobSpec,
}

/// Decode an evaluator's `job` output value into a `JobSpec`.
///
/// HCL interprets `${...}` as template interpolation, which the evaluator's
/// JSON output may contain incidentally (e.g. a shell-style variable in an
/// env value). Escaping it to `$${...}` before parsing keeps those bytes
/// literal.
pub fn decode_job_spec(job: &serde_json::Value) -> Result<JobSpec, EvalError> {
    let json = serde_json::to_string(job).map_err(|e| EvalError::Decode(e.to_string()))?;
    let escaped = json.replace("${", "$${");
    let wrapped = format!("job = {escaped}");
    let WrappedJob { job } =
        hcl::from_str(&wrapped).map_err(|e| EvalError::Decode(e.to_string()))?;
    Ok(job)
}
