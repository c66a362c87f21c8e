//! Engine configuration loading.

use std::path::Path;

use scfdeploy_deploy::EngineConfig;

/// Reads the engine configuration from `path`.
///
/// No path or a missing file gives the defaults. A file that does not parse
/// is reported and ignored.
pub fn load(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(EngineConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str::<EngineConfig>(&content) {
        Ok(config) => Ok(config),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse config, using defaults"
            );
            Ok(EngineConfig::default())
        }
    }
}
