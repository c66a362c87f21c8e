//! Bounded readiness poll after create/update.

use scfdeploy_protocol::{FunctionIdentity, FunctionStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ReadinessPolicy;
use crate::error::ReconcileError;
use crate::service::FunctionService;

/// Polls `status` at a fixed interval until the function is ready.
///
/// A `Failed` status ends the poll immediately. Poll errors are retried
/// like `Pending`; if the ceiling is hit while the last answer was an
/// error, that error is returned instead of a timeout.
pub async fn await_ready(
    functions: &dyn FunctionService,
    identity: &FunctionIdentity,
    policy: &ReadinessPolicy,
    cancel: &CancellationToken,
) -> Result<(), ReconcileError> {
    let attempts = policy.attempts();
    let mut last_error = None;

    for attempt in 1..=attempts {
        match functions.status(identity).await {
            Ok(FunctionStatus::Ready) => {
                debug!(function = %identity, attempt, "function ready");
                return Ok(());
            }
            Ok(FunctionStatus::Failed { reason }) => {
                return Err(ReconcileError::FunctionNotReady {
                    name: identity.name.clone(),
                    reason,
                });
            }
            Ok(FunctionStatus::Pending) => {
                debug!(function = %identity, attempt, "function pending");
                last_error = None;
            }
            Err(e) => {
                warn!(function = %identity, attempt, error = %e, "status check failed");
                last_error = Some(e);
            }
        }

        if attempt < attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
                _ = tokio::time::sleep(policy.interval()) => {}
            }
        }
    }

    Err(match last_error {
        Some(source) => ReconcileError::StatusPoll {
            name: identity.name.clone(),
            source,
        },
        None => ReconcileError::ReadinessTimeout {
            name: identity.name.clone(),
            attempts,
        },
    })
}
