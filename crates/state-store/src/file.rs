use std::path::{Path, PathBuf};

use scfdeploy_protocol::DeployedState;
use tracing::debug;

use crate::{StateError, StateStore};

/// Stores state as pretty-printed JSON in a single file.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous state intact.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<DeployedState, StateError> {
        if !self.path.exists() {
            return Ok(DeployedState::default());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(DeployedState::default());
        }
        let state: DeployedState = serde_json::from_str(&data)?;
        debug!(path = %self.path.display(), deployed = !state.is_empty(), "loaded state");
        Ok(state)
    }

    fn save(&self, state: &DeployedState) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(state)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, json)?;
        set_permissions_0600(&tmp);
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), deployed = !state.is_empty(), "persisted state");
        Ok(())
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Default location of the state file for `instance` under `state_root`:
/// `<state_root>/<instance>/state.json`.
pub fn default_state_path(state_root: &Path, instance: &str) -> PathBuf {
    state_root.join(instance).join("state.json")
}
