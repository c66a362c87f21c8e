//! Implementation of the `scfdeploy plan` command.

use std::path::Path;

use anyhow::Context;
use scfdeploy_deploy::{EngineConfig, TriggerAction, decide, plan};
use scfdeploy_protocol::{DeployedState, DesiredSpec, Fingerprint};
use scfdeploy_state::{JsonFileStore, StateStore, default_state_path};
use serde::Serialize;

/// What a deploy pass would do, computed without contacting any service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub function: String,
    pub fingerprint: String,
    pub code_changed: bool,
    pub identity_changed: bool,
    /// Upload is certain. When false the previous artifact is reused if
    /// storage still holds it.
    pub needs_upload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_artifact: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gateways: Vec<String>,
    pub create: Vec<String>,
    pub update: Vec<String>,
    pub delete: Vec<String>,
}

pub fn build_report(
    spec: &DesiredSpec,
    fingerprint: &Fingerprint,
    prior: &DeployedState,
) -> PlanReport {
    let identity = spec.identity();
    let decision = decide(prior, fingerprint, &identity);
    let prior_triggers = if decision.identity_changed {
        &[][..]
    } else {
        &prior.triggers[..]
    };
    let triggers = plan(&spec.events, prior_triggers);
    let keys = |action: TriggerAction| -> Vec<String> {
        triggers
            .keys(action)
            .into_iter()
            .map(|k| k.to_string())
            .collect()
    };

    PlanReport {
        function: identity.to_string(),
        fingerprint: fingerprint.to_string(),
        code_changed: decision.code_changed,
        identity_changed: decision.identity_changed,
        needs_upload: decision.needs_upload,
        verify_artifact: decision
            .wants_existence_check()
            .then(|| prior.artifact.as_ref().map(ToString::to_string))
            .flatten(),
        gateways: triggers
            .gateways
            .iter()
            .map(|g| g.service_name.clone())
            .collect(),
        create: keys(TriggerAction::Create),
        update: keys(TriggerAction::Update),
        delete: keys(TriggerAction::Delete),
    }
}

pub fn run(
    config: &EngineConfig,
    spec_path: &Path,
    artifact: &Path,
    state_path: Option<&Path>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(spec_path)
        .with_context(|| format!("reading spec {}", spec_path.display()))?;
    let spec: DesiredSpec = serde_json::from_str(&content)
        .with_context(|| format!("parsing spec {}", spec_path.display()))?;

    let fingerprint = scfdeploy_transfer::fingerprint_file(artifact)?;

    let store = match state_path {
        Some(path) => JsonFileStore::new(path),
        None => JsonFileStore::new(default_state_path(&config.state_root, &spec.name)),
    };
    let prior = store.load()?;
    tracing::debug!(state = %store.path().display(), deployed = !prior.is_empty(), "loaded prior state");

    let report = build_report(&spec, &fingerprint, &prior);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
