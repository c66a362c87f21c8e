//! Change detection and the artifact existence guard.

use scfdeploy_protocol::{ArtifactLocation, DeployedState, Fingerprint, FunctionIdentity};
use tracing::{debug, warn};

use crate::service::ObjectStorage;

/// Outcome of comparing a desired pass against the last committed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationDecision {
    pub code_changed: bool,
    /// Name, namespace or region differ from the deployed function.
    pub identity_changed: bool,
    pub needs_upload: bool,
}

impl ReconciliationDecision {
    /// Whether the previously uploaded artifact could be reused, pending the
    /// existence check.
    pub fn wants_existence_check(&self) -> bool {
        !self.code_changed && !self.identity_changed && !self.needs_upload
    }

    /// Folds the result of the existence check into the decision.
    pub fn apply_check(mut self, check: ArtifactCheck) -> Self {
        if check != ArtifactCheck::Present {
            self.needs_upload = true;
        }
        self
    }
}

/// Pure and total: an empty prior state reports everything as changed.
pub fn decide(
    prior: &DeployedState,
    fingerprint: &Fingerprint,
    identity: &FunctionIdentity,
) -> ReconciliationDecision {
    let code_changed = prior.code_fingerprint.as_ref() != Some(fingerprint);
    let identity_changed = prior.identity().as_ref() != Some(identity);
    // Nothing to carry forward without a recorded location.
    let no_artifact = prior.artifact.is_none();
    ReconciliationDecision {
        code_changed,
        identity_changed,
        needs_upload: code_changed || identity_changed || no_artifact,
    }
}

/// Result of asking storage whether an artifact still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactCheck {
    Present,
    Missing,
    /// The check itself failed, so presence is not known.
    Unknown,
}

/// Asks storage whether `location` still holds the artifact. Errors become
/// [`ArtifactCheck::Unknown`] rather than failing the pass.
pub async fn check_artifact(
    storage: &dyn ObjectStorage,
    location: &ArtifactLocation,
) -> ArtifactCheck {
    match storage.exists(location).await {
        Ok(true) => ArtifactCheck::Present,
        Ok(false) => {
            debug!(artifact = %location, "previous artifact no longer exists");
            ArtifactCheck::Missing
        }
        Err(e) => {
            warn!(
                artifact = %location,
                error = %e,
                "artifact existence check failed, forcing upload"
            );
            ArtifactCheck::Unknown
        }
    }
}
