//! Persisted record of the last committed reconciliation pass.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::remote::FunctionIdentity;
use crate::triggers::{TriggerKey, TriggerSpec};

/// Opaque content hash of a packaged code artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an uploaded artifact lives in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub bucket: String,
    pub key: String,
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// One public route of a gateway fronting the function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySummary {
    pub service_name: String,
    pub method: String,
    pub url: String,
}

/// Deployed function configuration, also returned to callers as the pass
/// summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedFunction {
    pub name: String,
    pub namespace: String,
    pub region: String,
    pub runtime: String,
    pub handler: String,
    pub memory_size: u32,
    pub timeout: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gateway: Vec<GatewaySummary>,
    /// Correlation tag the gateways were provisioned under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_remark: Option<String>,
}

impl DeployedFunction {
    pub fn identity(&self) -> FunctionIdentity {
        FunctionIdentity::new(&self.name, &self.namespace, &self.region)
    }

    /// Distinct gateway service names, in first-seen order.
    pub fn gateway_services(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for summary in &self.gateway {
            if !seen.contains(&summary.service_name.as_str()) {
                seen.push(&summary.service_name);
            }
        }
        seen
    }
}

/// A native trigger created on the function service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRecord {
    pub name: String,
    /// Identifier assigned by the function service.
    pub trigger_id: String,
    pub spec: TriggerSpec,
}

impl TriggerRecord {
    pub fn key(&self) -> TriggerKey {
        TriggerKey::new(self.spec.kind(), self.name.clone())
    }
}

/// Everything known about the managed function after the last successful
/// pass. The default value is the empty (never deployed / removed) state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed: Option<DeployedFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_fingerprint: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<TriggerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
}

impl DeployedState {
    pub fn is_empty(&self) -> bool {
        self.deployed.is_none()
    }

    pub fn identity(&self) -> Option<FunctionIdentity> {
        self.deployed.as_ref().map(DeployedFunction::identity)
    }
}
