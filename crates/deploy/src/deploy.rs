//! Deploy orchestrator.
//!
//! Runs one reconciliation pass through the [`Stage`] machine. Nothing is
//! persisted until `Commit`; any error before that leaves the stored state
//! exactly as it was so the next pass resumes from the last good state.

use std::path::PathBuf;

use chrono::Utc;
use scfdeploy_protocol::{
    ArtifactLocation, DeployedFunction, DeployedState, DesiredSpec, Fingerprint, FunctionConfig,
    FunctionIdentity, GatewaySummary,
};
use scfdeploy_transfer::{ChannelObserver, TransferError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::change::{ReconciliationDecision, check_artifact, decide};
use crate::config::EngineConfig;
use crate::error::ReconcileError;
use crate::readiness::await_ready;
use crate::service::{Collaborators, ServiceError};
use crate::stage::Stage;
use crate::triggers::{TriggerOutcome, TriggerReconciler};
use crate::types::{DeployEvent, EventSink};

/// Drives deploy, removal and configuration-only passes for one function.
///
/// Callers must not run two passes against the same function identity at
/// the same time.
pub struct DeployOrchestrator {
    pub(crate) services: Collaborators,
    pub(crate) config: EngineConfig,
    pub(crate) events: EventSink,
    events_rx: Option<mpsc::Receiver<DeployEvent>>,
    pub(crate) cancel: CancellationToken,
}

impl DeployOrchestrator {
    pub fn new(services: Collaborators, config: EngineConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        Self {
            services,
            config,
            events: EventSink::new(events_tx),
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DeployEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for passes run by this orchestrator.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Converges the remote function and its triggers to `spec`.
    ///
    /// Returns the committed summary, or the error of the stage that
    /// failed with the stored state left untouched.
    pub async fn deploy(&self, spec: &DesiredSpec) -> Result<DeployedFunction, ReconcileError> {
        let pass_id = Uuid::new_v4();
        info!(%pass_id, function = %spec.name, region = %spec.region, "deploy pass started");

        match self.run_deploy(spec).await {
            Ok(summary) => {
                self.events.emit(DeployEvent::Completed {
                    function: spec.name.clone(),
                });
                info!(%pass_id, function = %spec.name, "deploy pass committed");
                Ok(summary)
            }
            Err(e) => {
                self.events.emit(DeployEvent::Failed {
                    function: spec.name.clone(),
                    stage: e.stage(),
                    error: e.to_string(),
                });
                error!(%pass_id, function = %spec.name, stage = ?e.stage(), error = %e, "deploy pass failed");
                Err(e)
            }
        }
    }

    async fn run_deploy(&self, spec: &DesiredSpec) -> Result<DeployedFunction, ReconcileError> {
        let mut pass = StageTracker::start(&spec.name, &self.events, &self.cancel)?;
        let prior = self.services.state.load()?;
        let identity = spec.identity();

        if spec.role_auth_enabled() {
            self.services
                .functions
                .ensure_role(&spec.region)
                .await
                .map_err(ReconcileError::RoleSetup)?;
        }
        self.remove_stale_function(&prior, spec).await;

        let artifact_path = self.package(spec).await?;
        let fingerprint = self.fingerprint(artifact_path.clone()).await?;
        let decision = self.decide(&prior, &fingerprint, &identity).await;

        let artifact = match (decision.needs_upload, prior.artifact.clone()) {
            (false, Some(location)) => {
                pass.advance(Stage::SkipUpload)?;
                debug!(function = %spec.name, artifact = %location, "code unchanged, reusing artifact");
                location
            }
            _ => {
                pass.advance(Stage::Upload)?;
                self.upload(spec, &identity, &artifact_path).await?
            }
        };

        pass.advance(Stage::ApplyConfig)?;
        self.apply_config(spec, &identity, &artifact).await?;

        pass.advance(Stage::AwaitReady)?;
        await_ready(
            self.services.functions.as_ref(),
            &identity,
            &self.config.readiness,
            &self.cancel,
        )
        .await?;

        pass.advance(Stage::ReconcileTriggers)?;
        let prior_triggers = if decision.identity_changed {
            if !prior.triggers.is_empty() {
                debug!(
                    function = %spec.name,
                    count = prior.triggers.len(),
                    "identity changed, ignoring triggers of previous function"
                );
            }
            &[][..]
        } else {
            &prior.triggers[..]
        };
        let remark = spec
            .client_remark
            .as_deref()
            .unwrap_or(&self.config.client_remark);
        let TriggerOutcome { records, gateway } = TriggerReconciler::new(
            self.services.functions.as_ref(),
            self.services.gateway.as_ref(),
            &self.events,
            remark,
        )
        .reconcile(&identity, &spec.events, prior_triggers)
        .await?;

        pass.advance(Stage::Commit)?;
        let summary = summarize(spec, gateway, remark);
        let next = DeployedState {
            deployed: Some(summary.clone()),
            code_fingerprint: Some(fingerprint),
            artifact: Some(artifact),
            triggers: records,
            deployed_at: Some(Utc::now()),
        };
        self.services.state.save(&next)?;

        pass.advance(Stage::Done)?;
        Ok(summary)
    }

    /// Best-effort removal of the previously deployed function when the
    /// desired name differs. Never fails the pass.
    async fn remove_stale_function(&self, prior: &DeployedState, spec: &DesiredSpec) {
        let Some(old) = prior.deployed.as_ref() else {
            return;
        };
        if old.name == spec.name {
            return;
        }

        let identity = old.identity();
        info!(old = %identity, new = %spec.name, "function renamed, removing previous function");
        match self.services.functions.delete(&identity).await {
            Ok(()) | Err(ServiceError::NotFound(_)) => {
                self.events
                    .emit(DeployEvent::StaleFunctionRemoved { identity });
            }
            Err(e) => {
                warn!(old = %identity, error = %e, "failed to remove previous function, continuing");
                self.events.emit(DeployEvent::StaleFunctionCleanupFailed {
                    identity,
                    error: e.to_string(),
                });
            }
        }
    }

    async fn package(&self, spec: &DesiredSpec) -> Result<PathBuf, ReconcileError> {
        let output = self.config.artifact_path(&spec.name);
        let exclude = self.config.effective_excludes(&spec.exclude);
        debug!(function = %spec.name, output = %output.display(), "packaging code");
        self.services
            .packager
            .pack(
                std::path::Path::new(&spec.code_uri),
                &spec.include,
                &exclude,
                &output,
            )
            .await
            .map_err(ReconcileError::Packaging)
    }

    async fn fingerprint(&self, artifact: PathBuf) -> Result<Fingerprint, ReconcileError> {
        let fingerprinter = self.services.fingerprinter.clone();
        let fingerprint = tokio::task::spawn_blocking(move || fingerprinter.fingerprint(&artifact))
            .await
            .map_err(|e| TransferError::Io(std::io::Error::other(e)))??;
        Ok(fingerprint)
    }

    async fn decide(
        &self,
        prior: &DeployedState,
        fingerprint: &Fingerprint,
        identity: &FunctionIdentity,
    ) -> ReconciliationDecision {
        let mut decision = decide(prior, fingerprint, identity);
        if decision.wants_existence_check()
            && let Some(location) = prior.artifact.as_ref()
        {
            let check = check_artifact(self.services.storage.as_ref(), location).await;
            decision = decision.apply_check(check);
        }
        info!(
            function = %identity.name,
            code_changed = decision.code_changed,
            identity_changed = decision.identity_changed,
            needs_upload = decision.needs_upload,
            "change detection"
        );
        decision
    }

    async fn upload(
        &self,
        spec: &DesiredSpec,
        identity: &FunctionIdentity,
        artifact_path: &std::path::Path,
    ) -> Result<ArtifactLocation, ReconcileError> {
        let storage = self.services.storage.as_ref();
        let location = storage
            .artifact_location(identity)
            .await
            .map_err(ReconcileError::ArtifactUpload)?;

        let function = spec.name.clone();
        let observer = ChannelObserver::new(self.events.sender(), move |progress| {
            DeployEvent::UploadProgress {
                function: function.clone(),
                progress,
            }
        });

        info!(function = %spec.name, artifact = %location, "uploading code");
        storage
            .upload(&location, artifact_path, &observer)
            .await
            .map_err(ReconcileError::ArtifactUpload)?;
        info!(function = %spec.name, artifact = %location, "upload complete");
        Ok(location)
    }

    async fn apply_config(
        &self,
        spec: &DesiredSpec,
        identity: &FunctionIdentity,
        artifact: &ArtifactLocation,
    ) -> Result<(), ReconcileError> {
        let config = FunctionConfig {
            identity: identity.clone(),
            runtime: spec.runtime.clone(),
            handler: spec.handler.clone(),
            memory_size: spec.memory_size,
            timeout: spec.timeout,
            description: spec.description.clone(),
            environment: spec.environment.clone(),
            role: spec.role.clone(),
            code: artifact.clone(),
        };
        self.services
            .functions
            .create_or_update(&config)
            .await
            .map_err(|source| ReconcileError::ApplyConfig {
                name: spec.name.clone(),
                source,
            })?;

        if !spec.tags.is_empty() {
            self.services
                .functions
                .tag(identity, &spec.tags)
                .await
                .map_err(|source| ReconcileError::Tagging {
                    name: spec.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

fn summarize(spec: &DesiredSpec, gateway: Vec<GatewaySummary>, remark: &str) -> DeployedFunction {
    let client_remark = (!gateway.is_empty()).then(|| remark.to_string());
    DeployedFunction {
        name: spec.name.clone(),
        namespace: spec.namespace.clone(),
        region: spec.region.clone(),
        runtime: spec.runtime.clone(),
        handler: spec.handler.clone(),
        memory_size: spec.memory_size,
        timeout: spec.timeout,
        description: spec.description.clone(),
        role: spec.role.clone(),
        environment: spec.environment.clone(),
        gateway,
        client_remark,
    }
}

/// Current stage of a running pass. Every move is checked against the
/// transition table and the cancellation token.
struct StageTracker<'a> {
    current: Stage,
    function: &'a str,
    events: &'a EventSink,
    cancel: &'a CancellationToken,
}

impl<'a> StageTracker<'a> {
    fn start(
        function: &'a str,
        events: &'a EventSink,
        cancel: &'a CancellationToken,
    ) -> Result<Self, ReconcileError> {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        events.emit(DeployEvent::StageEntered {
            function: function.to_string(),
            stage: Stage::Start,
        });
        Ok(Self {
            current: Stage::Start,
            function,
            events,
            cancel,
        })
    }

    fn advance(&mut self, to: Stage) -> Result<(), ReconcileError> {
        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        if !self.current.can_transition(to) {
            return Err(ReconcileError::InvalidTransition {
                from: self.current,
                to,
            });
        }
        debug!(function = %self.function, from = %self.current, %to, "stage transition");
        self.current = to;
        self.events.emit(DeployEvent::StageEntered {
            function: self.function.to_string(),
            stage: to,
        });
        Ok(())
    }
}
