use std::sync::RwLock;

use scfdeploy_protocol::DeployedState;

use crate::{StateError, StateStore};

/// In-process store. Keeps the serialised JSON so that "byte-identical"
/// comparisons between passes are meaningful.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Option<String>>,
    writes: RwLock<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `state`.
    pub fn with_state(state: &DeployedState) -> Result<Self, StateError> {
        let store = Self::new();
        *store.data.write().unwrap() = Some(serde_json::to_string(state)?);
        Ok(store)
    }

    /// Raw serialised contents, `None` if never written.
    pub fn raw(&self) -> Option<String> {
        self.data.read().unwrap().clone()
    }

    /// Number of `save` calls observed.
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<DeployedState, StateError> {
        match self.data.read().unwrap().as_deref() {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(DeployedState::default()),
        }
    }

    fn save(&self, state: &DeployedState) -> Result<(), StateError> {
        let json = serde_json::to_string(state)?;
        *self.data.write().unwrap() = Some(json);
        *self.writes.write().unwrap() += 1;
        Ok(())
    }
}
