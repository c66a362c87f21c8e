//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded readiness poll after create/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadinessPolicy {
    /// Fixed delay between status checks.
    pub interval_ms: u64,
    /// Status checks before giving up. Values below 1 are treated as 1.
    pub max_attempts: u32,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 60,
        }
    }
}

impl ReadinessPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Settings shared by every pass an orchestrator runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Working directory for packaged artifacts and state files.
    pub state_root: PathBuf,
    pub readiness: ReadinessPolicy,
    /// Always excluded from packaging, on top of `DesiredSpec::exclude`.
    pub default_excludes: Vec<String>,
    /// Correlation tag for the gateway sub-system when `DesiredSpec::client_remark` is unset.
    pub client_remark: String,
    /// Capacity of the event channel.
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_root: PathBuf::from(".serverless"),
            readiness: ReadinessPolicy::default(),
            default_excludes: vec![
                ".serverless".into(),
                ".temp_env".into(),
                ".git/**".into(),
                ".gitignore".into(),
            ],
            client_remark: "scfdeploy".into(),
            event_buffer: 256,
        }
    }
}

impl EngineConfig {
    /// Where the packaged archive for function `name` is written.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.state_root.join(format!("{name}.zip"))
    }

    /// `exclude` followed by every default not already listed.
    pub fn effective_excludes(&self, exclude: &[String]) -> Vec<String> {
        let mut all = exclude.to_vec();
        for pattern in &self.default_excludes {
            if !all.contains(pattern) {
                all.push(pattern.clone());
            }
        }
        all
    }
}
