// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The evaluator subprocess boundary (§4.3): a narrow, mockable interface
//! (`list`, `evaluate_action`, `evaluate_run`) so the Brain and Invoker never
//! couple to the subprocess mechanism directly.

use crate::error::{EvalError, EvaluationError};
use crate::jobspec::decode_job_spec;
use crate::source_cache::SourceCache;
use async_trait::async_trait;
use cicero_core::{Action, ActionId, InputSpec, Source};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// The evaluator's `eval meta inputs` response: everything needed to build
/// or refresh an [`Action`] except its identity (§4.3: "ActionDefinition").
#[derive(Debug, Clone, Deserialize)]
pub struct ActionDefinition {
    #[serde(default)]
    pub meta: serde_json::Value,
    #[serde(default)]
    pub inputs: HashMap<String, InputSpec>,
}

/// The evaluator's `eval output job` response, post-transformer: the Fact
/// templates to publish on termination and the job to submit (§4.3: "RunDefinition").
#[derive(Debug, Clone, Deserialize)]
pub struct RunDefinition {
    pub success: serde_json::Value,
    pub failure: serde_json::Value,
    pub job: serde_json::Value,
}

impl RunDefinition {
    /// Decode `job` into a scheduler job spec (§4.3 step 6).
    pub fn job_spec(&self) -> Result<cicero_scheduler::JobSpec, EvalError> {
        decode_job_spec(&self.job)
    }
}

/// The three evaluator operations the engine needs (§4.3).
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn list(&self, src: &str) -> Result<Vec<String>, EvalError>;

    async fn evaluate_action(
        &self,
        src: &str,
        name: &str,
        id: ActionId,
    ) -> Result<ActionDefinition, EvalError>;

    async fn evaluate_run(
        &self,
        src: &str,
        name: &str,
        id: ActionId,
        inputs: &serde_json::Value,
    ) -> Result<RunDefinition, EvalError>;
}

/// Subprocess-backed [`Evaluator`]: fetches the source, runs
/// `cicero-evaluator-<name>` (falling back through the configured default
/// list when the source names none), and for run evaluation pipes the
/// result through the configured transformer chain.
pub struct ProcessEvaluator {
    cache: SourceCache,
    default_evaluators: Vec<String>,
    transformers: Vec<String>,
}

impl ProcessEvaluator {
    pub fn new(
        cache_root: impl Into<std::path::PathBuf>,
        default_evaluators: Vec<String>,
        transformers: Vec<String>,
    ) -> Self {
        Self { cache: SourceCache::new(cache_root), default_evaluators, transformers }
    }

    async fn fetch(&self, src: &str) -> Result<std::path::PathBuf, EvalError> {
        let parsed = Source::parse(src);
        self.cache.fetch(src, &parsed.fetch_url).await
    }

    /// Run the named evaluator against the fetched source with `args`,
    /// returning its raw stdout bytes.
    async fn invoke(
        &self,
        dst: &Path,
        evaluator_name: &str,
        action_name: &str,
        action_id: ActionId,
        args: &[&str],
        inputs: Option<&serde_json::Value>,
    ) -> Result<Vec<u8>, EvalError> {
        let program = format!("cicero-evaluator-{evaluator_name}");
        let mut command = Command::new(&program);
        command
            .args(args)
            .env("CICERO_ACTION_SRC", dst)
            .env("CICERO_ACTION_NAME", action_name)
            .env("CICERO_ACTION_ID", action_id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(inputs) = inputs {
            command.env("CICERO_ACTION_INPUTS", inputs.to_string());
        }

        let output = command.output().await?;
        if !output.status.success() {
            return Err(EvalError::Evaluation(EvaluationError {
                program,
                exit_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            }));
        }
        Ok(output.stdout)
    }

    /// Pipe `input` through each configured transformer in order (§4.3 step 6),
    /// each receiving the same `CICERO_ACTION_*` environment as the evaluator
    /// invocation that produced `bytes` (§6: "same environment minus source").
    async fn transform(
        &self,
        mut bytes: Vec<u8>,
        action_name: &str,
        action_id: ActionId,
        inputs: &serde_json::Value,
    ) -> Result<Vec<u8>, EvalError> {
        for program in &self.transformers {
            let mut command = Command::new(program);
            command
                .env("CICERO_ACTION_NAME", action_name)
                .env("CICERO_ACTION_ID", action_id.to_string())
                .env("CICERO_ACTION_INPUTS", inputs.to_string())
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            let mut child = command.spawn()?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(&bytes).await?;
            }
            let output = child.wait_with_output().await?;
            if !output.status.success() {
                return Err(EvalError::Evaluation(EvaluationError {
                    program: program.clone(),
                    exit_code: output.status.code(),
                    stdout: output.stdout,
                    stderr: output.stderr,
                }));
            }
            bytes = output.stdout;
        }
        Ok(bytes)
    }

    /// Evaluator selection (§4.3 step 3): a named fragment runs only that
    /// evaluator; otherwise try each default in order, accumulating failures.
    async fn run_with_selection(
        &self,
        dst: &Path,
        evaluator_hint: Option<&str>,
        action_name: &str,
        action_id: ActionId,
        args: &[&str],
        inputs: Option<&serde_json::Value>,
    ) -> Result<Vec<u8>, EvalError> {
        if let Some(name) = evaluator_hint {
            return self.invoke(dst, name, action_name, action_id, args, inputs).await;
        }

        let mut failures = Vec::new();
        for name in &self.default_evaluators {
            match self.invoke(dst, name, action_name, action_id, args, inputs).await {
                Ok(bytes) => return Ok(bytes),
                Err(EvalError::Evaluation(e)) => failures.push((name.clone(), e)),
                Err(other) => return Err(other),
            }
        }
        Err(EvalError::AllEvaluatorsFailed(failures))
    }
}

#[async_trait]
impl Evaluator for ProcessEvaluator {
    async fn list(&self, src: &str) -> Result<Vec<String>, EvalError> {
        let parsed = Source::parse(src);
        let dst = self.fetch(src).await?;
        let bytes = self
            .run_with_selection(&dst, parsed.evaluator.as_deref(), "", ActionId::new(), &["list"], None)
            .await?;
        serde_json::from_slice(&bytes).map_err(|e| EvalError::Decode(e.to_string()))
    }

    async fn evaluate_action(
        &self,
        src: &str,
        name: &str,
        id: ActionId,
    ) -> Result<ActionDefinition, EvalError> {
        let parsed = Source::parse(src);
        let dst = self.fetch(src).await?;
        let bytes = self
            .run_with_selection(
                &dst,
                parsed.evaluator.as_deref(),
                name,
                id,
                &["eval", "meta", "inputs"],
                None,
            )
            .await?;
        serde_json::from_slice(&bytes).map_err(|e| EvalError::Decode(e.to_string()))
    }

    async fn evaluate_run(
        &self,
        src: &str,
        name: &str,
        id: ActionId,
        inputs: &serde_json::Value,
    ) -> Result<RunDefinition, EvalError> {
        let parsed = Source::parse(src);
        let dst = self.fetch(src).await?;
        let bytes = self
            .run_with_selection(
                &dst,
                parsed.evaluator.as_deref(),
                name,
                id,
                &["eval", "output", "job"],
                Some(inputs),
            )
            .await?;
        let transformed = self.transform(bytes, name, id, inputs).await?;
        serde_json::from_slice(&transformed).map_err(|e| EvalError::Decode(e.to_string()))
    }
}

/// Build the [`Action`] identity around an [`ActionDefinition`] (used by the
/// Brain when an Action is (re-)registered from a source — the evaluator
/// only describes the definition, never the identity or timestamp).
pub fn action_from_definition(
    source: String,
    name: String,
    definition: ActionDefinition,
    created_at: chrono::DateTime<chrono::Utc>,
) -> Action {
    Action {
        id: ActionId::new(),
        name,
        source,
        meta: definition.meta,
        inputs: definition.inputs,
        created_at,
    }
}
