//! Model service clients for Log Detective.
//!
//! All providers implement the `logdetective_core::Provider` trait.
//! [`build_from_config`] creates the OpenAI-compatible client; callers wrap
//! it in a [`RetryingProvider`] built from the same configuration.

pub mod openai_compat;
pub mod retry;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, RetryingProvider};

use logdetective_config::AppConfig;
use logdetective_core::error::ProviderError;
use logdetective_core::provider::Provider;
use std::sync::Arc;

/// Build the model provider described by `config`.
///
/// Fails with `NotConfigured` when the model credential is missing.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .model
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("model.api_key is not set".into()))?;

    Ok(Arc::new(OpenAiCompatProvider::new(
        "openai",
        &config.model.base_url,
        api_key,
    )?))
}
