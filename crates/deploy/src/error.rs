//! Reconciliation error types.

use scfdeploy_protocol::TriggerKey;
use scfdeploy_state::StateError;
use scfdeploy_transfer::TransferError;

use crate::service::ServiceError;
use crate::stage::Stage;
use crate::types::TriggerAction;

/// Errors that abort a reconciliation pass. Persisted state is never
/// written when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("role setup failed: {0}")]
    RoleSetup(#[source] ServiceError),

    #[error("packaging failed: {0}")]
    Packaging(#[source] ServiceError),

    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] TransferError),

    #[error("artifact upload failed: {0}")]
    ArtifactUpload(#[source] ServiceError),

    #[error("lookup of function {name} failed: {source}")]
    FunctionLookup { name: String, source: ServiceError },

    #[error("function {name} does not exist")]
    FunctionNotFound { name: String },

    #[error("applying configuration to function {name} failed: {source}")]
    ApplyConfig { name: String, source: ServiceError },

    #[error("tagging function {name} failed: {source}")]
    Tagging { name: String, source: ServiceError },

    #[error("function {name} update failed: {reason}")]
    FunctionNotReady { name: String, reason: String },

    #[error("function {name} not ready after {attempts} status checks")]
    ReadinessTimeout { name: String, attempts: u32 },

    #[error("status check for function {name} failed: {source}")]
    StatusPoll { name: String, source: ServiceError },

    #[error("gateway {service} provisioning failed: {source}")]
    DelegatedProvisioning { service: String, source: ServiceError },

    #[error("{action} of trigger {trigger} failed ({failed} trigger operation(s) failed): {source}")]
    TriggerReconciliation {
        trigger: TriggerKey,
        action: TriggerAction,
        failed: usize,
        source: ServiceError,
    },

    #[error("removal of function {name} failed: {source}")]
    Removal { name: String, source: ServiceError },

    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("invalid stage transition {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("cancelled")]
    Cancelled,
}

impl ReconcileError {
    /// The deploy stage this error aborted, if it came from a deploy pass.
    pub fn stage(&self) -> Option<Stage> {
        use ReconcileError::*;
        match self {
            RoleSetup(_) | Packaging(_) | Fingerprint(_) => Some(Stage::Start),
            ArtifactUpload(_) => Some(Stage::Upload),
            ApplyConfig { .. } | Tagging { .. } | FunctionLookup { .. } => Some(Stage::ApplyConfig),
            FunctionNotReady { .. } | ReadinessTimeout { .. } | StatusPoll { .. } => {
                Some(Stage::AwaitReady)
            }
            DelegatedProvisioning { .. } | TriggerReconciliation { .. } => {
                Some(Stage::ReconcileTriggers)
            }
            State(_) => Some(Stage::Commit),
            FunctionNotFound { .. } | Removal { .. } | InvalidTransition { .. } | Cancelled => None,
        }
    }

    /// Whether retrying the same pass later may succeed without any change
    /// to the desired spec.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReconcileError::ArtifactUpload(_)
                | ReconcileError::ReadinessTimeout { .. }
                | ReconcileError::StatusPoll { .. }
                | ReconcileError::Cancelled
        )
    }
}
