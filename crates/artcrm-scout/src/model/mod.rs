//! Language-model backends used for lead enrichment.

mod anthropic;
mod deepseek;

pub use anthropic::AnthropicClient;
pub use deepseek::DeepseekClient;

use std::future::Future;

use artcrm_core::{AppConfig, ModelBackend};

use crate::error::ModelError;

/// Text generation capability.
pub trait LanguageModel {
    fn generate(
        &self,
        backend: ModelBackend,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// Dispatches each call to the client serving the requested backend.
pub struct ModelRouter {
    anthropic: AnthropicClient,
    deepseek: DeepseekClient,
}

impl ModelRouter {
    #[must_use]
    pub fn new(anthropic: AnthropicClient, deepseek: DeepseekClient) -> Self {
        Self {
            anthropic,
            deepseek,
        }
    }

    /// Builds both clients from configuration. Missing API keys are not an
    /// error here; calls to that backend fail with [`ModelError::MissingApiKey`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if an HTTP client cannot be built or a base URL
    /// does not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, ModelError> {
        let anthropic = AnthropicClient::new(
            config.anthropic_api_key.as_deref(),
            &config.claude_model,
            config.request_timeout_secs,
            &config.user_agent,
        )?;
        let deepseek = DeepseekClient::with_base_url(
            config.deepseek_api_key.as_deref(),
            config.request_timeout_secs,
            &config.user_agent,
            &config.deepseek_base_url,
        )?;
        Ok(Self::new(anthropic, deepseek))
    }
}

impl LanguageModel for ModelRouter {
    async fn generate(
        &self,
        backend: ModelBackend,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ModelError> {
        tracing::debug!(backend = %backend, max_tokens, "calling language model");
        match backend {
            ModelBackend::Claude => self.anthropic.complete(prompt, system, max_tokens).await,
            ModelBackend::DeepseekChat | ModelBackend::DeepseekReasoner => {
                self.deepseek
                    .complete(backend.as_str(), prompt, system, max_tokens)
                    .await
            }
        }
    }
}
