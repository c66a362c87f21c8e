//! Durable storage for [`DeployedState`].
//!
//! The store is read once at the start of a pass and written once at commit.
//! It is single-writer; callers serialise passes per function identity.

mod file;
mod memory;

use scfdeploy_protocol::DeployedState;

pub use file::{JsonFileStore, default_state_path};
pub use memory::MemoryStore;

/// Errors from state persistence.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence for the last committed deployment state.
pub trait StateStore: Send + Sync {
    /// Returns the stored state, or the empty state if nothing was saved yet.
    fn load(&self) -> Result<DeployedState, StateError>;

    /// Replaces the stored state.
    fn save(&self, state: &DeployedState) -> Result<(), StateError>;

    /// Resets the store to the empty state.
    fn clear(&self) -> Result<(), StateError> {
        self.save(&DeployedState::default())
    }
}
