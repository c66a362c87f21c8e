//! Removal orchestrator.

use scfdeploy_protocol::DeployedFunction;
use tracing::{debug, info, warn};

use crate::deploy::DeployOrchestrator;
use crate::error::ReconcileError;
use crate::service::ServiceError;
use crate::types::DeployEvent;

impl DeployOrchestrator {
    /// Tears down the function recorded in the state store.
    ///
    /// Works only from stored state: the function is deleted in the
    /// namespace and region it was deployed to. Returns `None` when nothing
    /// is deployed, which makes a second call a no-op.
    pub async fn remove(&self) -> Result<Option<DeployedFunction>, ReconcileError> {
        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let state = self.services.state.load()?;
        let Some(deployed) = state.deployed else {
            debug!("no function recorded in state, skipping removal");
            return Ok(None);
        };
        let identity = deployed.identity();
        info!(function = %identity, "removing function");

        let remark = deployed
            .client_remark
            .as_deref()
            .unwrap_or(&self.config.client_remark);
        for service in deployed.gateway_services() {
            match self.services.gateway.deprovision(service, remark).await {
                Ok(()) => debug!(function = %identity, service, "gateway removed"),
                Err(e) => {
                    warn!(function = %identity, service, error = %e, "gateway removal failed, continuing")
                }
            }
        }

        // One call removes the function together with its native triggers.
        match self.services.functions.delete(&identity).await {
            Ok(()) => {}
            Err(ServiceError::NotFound(_)) => {
                debug!(function = %identity, "function already gone");
            }
            Err(source) => {
                return Err(ReconcileError::Removal {
                    name: identity.name.clone(),
                    source,
                });
            }
        }

        self.services.state.clear()?;
        info!(function = %identity, "function removed");
        self.events.emit(DeployEvent::Removed { identity });
        Ok(Some(deployed))
    }
}
