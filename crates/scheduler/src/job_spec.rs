// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`JobSpec`]: the freeform `job` field an evaluator's `eval output job`
//! produces, decoded per §4.3 step 7 into something `submit` can hand to the
//! external scheduler.
//!
//! Kept deliberately small: one container, an image, a command, and an
//! environment map — everything a `cicero-evaluator-*` needs to describe to
//! run a batch job on Kubernetes. `cicero-eval::jobspec` is responsible for
//! the `${` → `$${` escaping and HCL decode that produces this type from the
//! evaluator's raw JSON; this module only owns the shape and its translation
//! into a Kubernetes `Job`.

use cicero_core::RunId;
use k8s_openapi::api::batch::v1::{Job, JobSpec as K8sJobSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Label selector value used to find every Kubernetes Job this engine owns
/// (so the event-stream watch and orphan cleanup never touch unrelated Jobs).
pub const MANAGED_BY_LABEL: &str = "cicero.dev/managed-by";
pub const MANAGED_BY_VALUE: &str = "cicero";
pub const RUN_ID_LABEL: &str = "cicero.dev/run-id";

impl JobSpec {
    /// Render a Kubernetes batch `Job` manifest for `run_id`, named so that
    /// the Run ID doubles as the external scheduler's job name (§3).
    pub fn to_k8s_job(&self, run_id: RunId, namespace: &str) -> Job {
        let env: Vec<EnvVar> = self
            .env
            .iter()
            .map(|(k, v)| EnvVar { name: k.clone(), value: Some(v.clone()), ..Default::default() })
            .collect();

        let container = Container {
            name: "run".to_string(),
            image: Some(self.image.clone()),
            command: (!self.command.is_empty()).then(|| self.command.clone()),
            args: (!self.args.is_empty()).then(|| self.args.clone()),
            env: (!env.is_empty()).then_some(env),
            ..Default::default()
        };

        let mut labels = BTreeMap::new();
        labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
        labels.insert(RUN_ID_LABEL.to_string(), run_id.to_string());

        Job {
            metadata: ObjectMeta {
                name: Some(job_name(run_id)),
                namespace: Some(namespace.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: Some(K8sJobSpec {
                backoff_limit: Some(0),
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![container],
                        restart_policy: Some("Never".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// The Kubernetes Job name for `run_id`. Lowercase hyphenated UUIDs are
/// already valid DNS-1123 subdomain segments, so no re-encoding is needed.
pub fn job_name(run_id: RunId) -> String {
    format!("cicero-run-{}", run_id)
}

/// Parse a Job name back into a [`RunId`], per §4.6 step 1 ("parse the
/// allocation's JobID as a Run ID; if it does not parse, ignore").
pub fn parse_job_name(name: &str) -> Option<RunId> {
    let raw = name.strip_prefix("cicero-run-")?;
    RunId::parse(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_name_round_trips() {
        let run_id = RunId::new();
        let name = job_name(run_id);
        assert_eq!(parse_job_name(&name), Some(run_id));
    }

    #[test]
    fn unrelated_name_does_not_parse() {
        assert_eq!(parse_job_name("some-other-job"), None);
    }
}
