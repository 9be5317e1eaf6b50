use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::http::{build_client, normalise_base_url, snippet};

const BACKEND: &str = "deepseek";

/// Client for DeepSeek's OpenAI-compatible chat completions endpoint.
///
/// Serves both `deepseek-chat` and `deepseek-reasoner`; the model name is
/// chosen per call.
pub struct DeepseekClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl DeepseekClient {
    /// Creates a client for `base_url`, the configured endpoint (or wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Http`] if the `reqwest` client cannot be built,
    /// or [`ModelError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: Option<&str>,
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
            base_url: normalise_base_url(base_url)?,
        })
    }

    /// Sends an optional system turn plus one user turn to `model`.
    ///
    /// # Errors
    ///
    /// - [`ModelError::MissingApiKey`] when no key is configured.
    /// - [`ModelError::Http`] on network failure.
    /// - [`ModelError::Status`] on a non-2xx response.
    /// - [`ModelError::MalformedResponse`] when there is no first choice.
    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ModelError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ModelError::MissingApiKey("DEEPSEEK_API_KEY"))?;
        let url = self
            .base_url
            .join("chat/completions")
            .map_err(|e| ModelError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model,
            messages,
            max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
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

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::MalformedResponse {
                backend: BACKEND,
                reason: "no message in first choice".to_string(),
            })
    }
}
