//! Artifact transfer helpers: upload progress observation and content
//! fingerprinting.
//!
//! Progress reporting is advisory. An observer is injected per upload call;
//! nothing here keeps shared UI state.

mod fingerprint;
mod progress;

pub use fingerprint::fingerprint_file;
pub use progress::{
    ChannelObserver, NoopObserver, ProgressObserver, ProgressReporter, SpeedCalculator,
    UploadProgress,
};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact not found: {0}")]
    ArtifactMissing(String),
}
