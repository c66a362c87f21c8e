//! Shapes exchanged with the remote function service and gateway sub-system.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::ArtifactLocation;

/// The (name, namespace, region) triple that scopes a function and the
/// storage location of its code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionIdentity {
    pub name: String,
    pub namespace: String,
    pub region: String,
}

impl FunctionIdentity {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.namespace, self.name)
    }
}

/// Payload for creating or updating a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionConfig {
    pub identity: FunctionIdentity,
    pub runtime: String,
    pub handler: String,
    pub memory_size: u32,
    pub timeout: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub code: ArtifactLocation,
}

/// Reported lifecycle status of a remote function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FunctionStatus {
    Ready,
    Pending,
    Failed { reason: String },
}

/// A remote function as described by the function service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    pub identity: FunctionIdentity,
    pub runtime: String,
    pub handler: String,
    pub memory_size: u32,
    pub timeout: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub status: FunctionStatus,
}

/// A route created by the gateway sub-system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayApi {
    pub method: String,
    pub path: String,
}

/// Result of provisioning one gateway group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayDeployment {
    pub apis: Vec<GatewayApi>,
    pub sub_domain: String,
    #[serde(default)]
    pub protocols: Vec<String>,
    /// Release stage the routes are published under.
    pub environment: String,
}

impl GatewayDeployment {
    /// `https` when the gateway offers it, `http` otherwise.
    pub fn preferred_protocol(&self) -> &'static str {
        if self
            .protocols
            .iter()
            .any(|p| p.eq_ignore_ascii_case("https"))
        {
            "https"
        } else {
            "http"
        }
    }

    /// Public URL for `api` on this gateway.
    pub fn url_for(&self, api: &GatewayApi) -> String {
        format!(
            "{}://{}/{}{}",
            self.preferred_protocol(),
            self.sub_domain,
            self.environment,
            api.path
        )
    }
}
