//! Error types for the Log Detective domain.
//!
//! One `thiserror` enum per bounded context. The orchestration layer maps
//! them onto its own run-level error.

use thiserror::Error;

/// Failures talking to the model service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether a later attempt of the same request may succeed.
    ///
    /// Authentication and client-side (4xx) failures are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_)
            | ProviderError::Timeout(_)
            | ProviderError::RateLimited { .. } => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_) => false,
        }
    }
}

/// Failures talking to the sandbox service.
#[derive(Debug, Clone, Error)]
pub enum SandboxError {
    #[error("Failed to provision execution context: {0}")]
    Provisioning(String),

    #[error("Sandbox authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Sandbox API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Interrupted before the run completed")]
    Interrupted,
}

/// Failures dispatching a single tool call.
///
/// These are never fatal to the agent loop: they are rendered as text and
/// handed back to the model.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
