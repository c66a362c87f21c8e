//! Desired function declaration, the input of every reconciliation pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::remote::FunctionIdentity;
use crate::triggers::{TriggerKey, TriggerSpec};

/// A named event source attached to the function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    pub name: String,
    pub trigger: TriggerSpec,
}

impl EventSpec {
    pub fn key(&self) -> TriggerKey {
        TriggerKey::new(self.trigger.kind(), self.name.clone())
    }
}

/// Declared function configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredSpec {
    pub name: String,
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
    pub namespace: String,
    pub region: String,
    /// Source directory handed to the packager.
    pub code_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_role_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_remark: Option<String>,
}

impl DesiredSpec {
    pub fn identity(&self) -> FunctionIdentity {
        FunctionIdentity::new(&self.name, &self.namespace, &self.region)
    }

    /// Role auth is on unless explicitly disabled.
    pub fn role_auth_enabled(&self) -> bool {
        self.enable_role_auth.unwrap_or(true)
    }
}

/// Configuration-only change to an existing function. `None` fields keep
/// their current remote value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub name: String,
    pub namespace: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_role_auth: Option<bool>,
}

impl ConfigUpdate {
    pub fn identity(&self) -> FunctionIdentity {
        FunctionIdentity::new(&self.name, &self.namespace, &self.region)
    }

    pub fn role_auth_enabled(&self) -> bool {
        self.enable_role_auth.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triggers::TriggerKind;

    const SPEC_JSON: &str = r#"{
        "name": "hello",
        "runtime": "python3.9",
        "handler": "index.main",
        "memorySize": 128,
        "timeout": 3,
        "namespace": "default",
        "region": "ap-guangzhou",
        "codeUri": "./src",
        "events": [
            {"name": "every-minute", "trigger": {"type": "timer", "properties": {"cronExpression": "* * * * *"}}},
            {"name": "api", "trigger": {"type": "api_gateway", "properties": {"serviceName": "hello-svc"}}}
        ]
    }"#;

    #[test]
    fn parses_minimal_spec() {
        let spec: DesiredSpec = serde_json::from_str(SPEC_JSON).unwrap();
        assert_eq!(spec.name, "hello");
        assert_eq!(spec.events.len(), 2);
        assert_eq!(spec.events[0].key(), TriggerKey::new(TriggerKind::Timer, "every-minute"));
        assert!(spec.events[1].trigger.is_delegated());
        assert!(spec.role.is_none());
    }

    #[test]
    fn role_auth_defaults_to_enabled() {
        let mut spec: DesiredSpec = serde_json::from_str(SPEC_JSON).unwrap();
        assert!(spec.role_auth_enabled());
        spec.enable_role_auth = Some(false);
        assert!(!spec.role_auth_enabled());
        spec.enable_role_auth = Some(true);
        assert!(spec.role_auth_enabled());
    }

    #[test]
    fn identity_triple() {
        let spec: DesiredSpec = serde_json::from_str(SPEC_JSON).unwrap();
        let id = spec.identity();
        assert_eq!(id.name, "hello");
        assert_eq!(id.namespace, "default");
        assert_eq!(id.region, "ap-guangzhou");
    }

    #[test]
    fn config_update_omits_unset_fields() {
        let update = ConfigUpdate {
            name: "hello".into(),
            namespace: "default".into(),
            region: "ap-guangzhou".into(),
            timeout: Some(10),
            ..Default::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"timeout\":10"));
        assert!(!json.contains("memorySize"));
        assert!(!json.contains("environment"));
    }
}
