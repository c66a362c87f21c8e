//! Configuration-only update path.

use scfdeploy_protocol::{ConfigUpdate, DeployedFunction, FunctionDescriptor};
use tracing::info;

use crate::deploy::DeployOrchestrator;
use crate::error::ReconcileError;

impl DeployOrchestrator {
    /// Applies memory, timeout, description, environment and role to an
    /// existing function without touching code, artifact or triggers.
    ///
    /// Stored state is only rewritten when it tracks the same function, and
    /// then only its configuration fields.
    pub async fn update_config(
        &self,
        update: &ConfigUpdate,
    ) -> Result<DeployedFunction, ReconcileError> {
        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let identity = update.identity();
        let functions = self.services.functions.as_ref();

        if update.role_auth_enabled() {
            functions
                .ensure_role(&update.region)
                .await
                .map_err(ReconcileError::RoleSetup)?;
        }

        let current = functions
            .get(&identity)
            .await
            .map_err(|source| ReconcileError::FunctionLookup {
                name: update.name.clone(),
                source,
            })?
            .ok_or_else(|| ReconcileError::FunctionNotFound {
                name: update.name.clone(),
            })?;

        info!(function = %identity, "updating function configuration");
        functions
            .update_configuration(update)
            .await
            .map_err(|source| ReconcileError::ApplyConfig {
                name: update.name.clone(),
                source,
            })?;

        let applied = overlay(&current, update);
        let mut state = self.services.state.load()?;
        let Some(deployed) = state
            .deployed
            .as_mut()
            .filter(|deployed| deployed.identity() == identity)
        else {
            info!(function = %identity, "function configuration updated, state tracks another function");
            return Ok(applied);
        };
        deployed.memory_size = applied.memory_size;
        deployed.timeout = applied.timeout;
        deployed.description = applied.description;
        deployed.environment = applied.environment;
        deployed.role = applied.role;
        let summary = deployed.clone();
        self.services.state.save(&state)?;

        info!(function = %identity, "function configuration updated");
        Ok(summary)
    }
}

/// The remote function as it will look once `update` is applied.
fn overlay(current: &FunctionDescriptor, update: &ConfigUpdate) -> DeployedFunction {
    DeployedFunction {
        name: current.identity.name.clone(),
        namespace: current.identity.namespace.clone(),
        region: current.identity.region.clone(),
        runtime: current.runtime.clone(),
        handler: current.handler.clone(),
        memory_size: update.memory_size.unwrap_or(current.memory_size),
        timeout: update.timeout.unwrap_or(current.timeout),
        description: update
            .description
            .clone()
            .unwrap_or_else(|| current.description.clone()),
        role: update.role.clone().or_else(|| current.role.clone()),
        environment: update
            .environment
            .clone()
            .unwrap_or_else(|| current.environment.clone()),
        gateway: Vec::new(),
        client_remark: None,
    }
}
