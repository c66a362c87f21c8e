//! Data model for serverless function reconciliation.
//!
//! Shared by the engine, the state store and the CLI. Everything here is
//! plain serde data; no I/O.

pub mod remote;
pub mod spec;
pub mod state;
pub mod triggers;

// Re-export primary types for convenience.
pub use remote::{
    FunctionConfig, FunctionDescriptor, FunctionIdentity, FunctionStatus, GatewayApi,
    GatewayDeployment,
};
pub use spec::{ConfigUpdate, DesiredSpec, EventSpec};
pub use state::{
    ArtifactLocation, DeployedFunction, DeployedState, Fingerprint, GatewaySummary, TriggerRecord,
};
pub use triggers::{
    GatewayEndpoint, GatewayTrigger, QueueTrigger, StorageFilter, StorageTrigger, StreamOffset,
    StreamTrigger, TimerTrigger, TriggerKey, TriggerKind, TriggerSpec,
};
