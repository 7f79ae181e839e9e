//! Run-level errors.
//!
//! Tool failures never get here (they are fed back to the model) and neither
//! does a failed release (it is logged). What remains ends the run.

use logdetective_config::ConfigError;
use logdetective_core::error::{ProviderError, SandboxError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectiveError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Cannot read '{}': {reason}", path.display())]
    Input { path: PathBuf, reason: String },

    #[error("Execution context unavailable: {0}")]
    Provisioning(SandboxError),

    #[error("Interrupted")]
    Interrupted,

    #[error("Model service error: {0}")]
    ModelTransport(#[from] ProviderError),
}

impl From<SandboxError> for DetectiveError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::Interrupted => Self::Interrupted,
            other => Self::Provisioning(other),
        }
    }
}
