//! Event trigger variants.
//!
//! Every trigger kind carries its own strongly typed payload. On the wire a
//! trigger is `{"type": "<kind>", "properties": {...}}`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminant of a [`TriggerSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Timer,
    ObjectStorage,
    Queue,
    Stream,
    ApiGateway,
}

impl TriggerKind {
    /// Delegated triggers are provisioned by an external sub-system rather
    /// than by the function service itself.
    pub fn is_delegated(self) -> bool {
        matches!(self, TriggerKind::ApiGateway)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::Timer => "timer",
            TriggerKind::ObjectStorage => "object_storage",
            TriggerKind::Queue => "queue",
            TriggerKind::Stream => "stream",
            TriggerKind::ApiGateway => "api_gateway",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical identity of a trigger: its kind plus a disambiguating name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerKey {
    pub kind: TriggerKind,
    pub name: String,
}

impl TriggerKey {
    pub fn new(kind: TriggerKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

/// Cron-scheduled invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerTrigger {
    pub cron_expression: String,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

/// Key filter applied to object-storage events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageFilter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,
}

/// Invocation on object-storage bucket events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageTrigger {
    pub bucket: String,
    pub events: String,
    #[serde(default)]
    pub filter: StorageFilter,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enable: bool,
}

/// Invocation on messages published to a queue topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTrigger {
    pub topic: String,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enable: bool,
}

/// Starting position when consuming a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOffset {
    #[default]
    Latest,
    Earliest,
}

/// Invocation on records from a stream topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamTrigger {
    pub instance: String,
    pub topic: String,
    #[serde(default = "default_max_batch")]
    pub max_batch: u32,
    #[serde(default)]
    pub offset: StreamOffset,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enable: bool,
}

fn default_max_batch() -> u32 {
    100
}

/// A single HTTP route exposed by a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEndpoint {
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

/// HTTP gateway in front of the function. Provisioned by the gateway
/// sub-system; one gateway is shared by every trigger naming the same
/// `service_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayTrigger {
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub endpoints: Vec<GatewayEndpoint>,
}

fn default_environment() -> String {
    "release".into()
}

/// Kind-specific trigger payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "snake_case")]
pub enum TriggerSpec {
    Timer(TimerTrigger),
    ObjectStorage(StorageTrigger),
    Queue(QueueTrigger),
    Stream(StreamTrigger),
    ApiGateway(GatewayTrigger),
}

impl TriggerSpec {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerSpec::Timer(_) => TriggerKind::Timer,
            TriggerSpec::ObjectStorage(_) => TriggerKind::ObjectStorage,
            TriggerSpec::Queue(_) => TriggerKind::Queue,
            TriggerSpec::Stream(_) => TriggerKind::Stream,
            TriggerSpec::ApiGateway(_) => TriggerKind::ApiGateway,
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.kind().is_delegated()
    }
}
