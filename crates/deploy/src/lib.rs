//! Serverless function reconciliation engine.
//!
//! This crate implements the **business logic** that converges a remote
//! function and its event triggers to a declared [`DesiredSpec`] with the
//! fewest remote operations. Credentials, packaging, storage transport, the
//! function API and the gateway sub-system are external; callers provide
//! them through the traits in [`service`].
//!
//! # Pipeline
//!
//! 1. **Start**: load state, clean up a renamed function, package,
//!    fingerprint and decide whether code must be uploaded
//! 2. **Upload / SkipUpload**: upload a fresh artifact or reuse the
//!    previous one once storage confirms it still exists
//! 3. **ApplyConfig**: create or update the function, then tag it
//! 4. **AwaitReady**: poll status until ready, failed or out of attempts
//! 5. **ReconcileTriggers**: provision gateways, diff native triggers
//! 6. **Commit**: write the new state, the only persisted mutation
//!
//! [`DesiredSpec`]: scfdeploy_protocol::DesiredSpec

pub mod change;
pub mod config;
pub mod deploy;
pub mod error;
pub mod readiness;
mod remove;
pub mod service;
pub mod stage;
pub mod triggers;
pub mod types;
mod update;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience.
pub use change::{ArtifactCheck, ReconciliationDecision, check_artifact, decide};
pub use config::{EngineConfig, ReadinessPolicy};
pub use deploy::DeployOrchestrator;
pub use error::ReconcileError;
pub use readiness::await_ready;
pub use service::{
    Collaborators, Fingerprinter, FunctionService, GatewayProvisioner, GatewayRequest,
    ObjectStorage, Packager, ServiceError, ServiceFuture, Sha256Fingerprinter,
};
pub use stage::{Stage, TRANSITIONS};
pub use triggers::{
    GatewayGroup, NativeOp, TriggerOutcome, TriggerPlan, TriggerReconciler, plan,
};
pub use types::{DeployEvent, EventSink, TriggerAction};
