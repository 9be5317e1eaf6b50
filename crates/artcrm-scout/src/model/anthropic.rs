use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::http::{build_client, normalise_base_url, snippet};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/";
const API_VERSION: &str = "2023-06-01";
const BACKEND: &str = "anthropic";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a professional writer helping an artist with gallery outreach.";

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    /// # Errors
    ///
    /// Returns [`ModelError::Http`] if the `reqwest` client cannot be built.
    pub fn new(
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ModelError> {
        Self::with_base_url(api_key, model, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Http`] if the `reqwest` client cannot be built,
    /// or [`ModelError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            api_key: api_key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            model: model.to_string(),
            base_url: normalise_base_url(base_url)?,
        })
    }

    /// Sends one user turn and returns the text of the first content block.
    ///
    /// # Errors
    ///
    /// - [`ModelError::MissingApiKey`] when no key is configured.
    /// - [`ModelError::Http`] on network failure.
    /// - [`ModelError::Status`] on a non-2xx response.
    /// - [`ModelError::MalformedResponse`] when the reply has no text.
    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ModelError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ModelError::MissingApiKey("ANTHROPIC_API_KEY"))?;
        let url = self
            .base_url
            .join("v1/messages")
            .map_err(|e| ModelError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            system: system.unwrap_or(DEFAULT_SYSTEM_PROMPT),
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                backend: BACKEND,
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| ModelError::MalformedResponse {
                backend: BACKEND,
                reason: "no text in first content block".to_string(),
            })
    }
}
