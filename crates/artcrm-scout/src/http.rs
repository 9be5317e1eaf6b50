//! Shared HTTP plumbing for the source adapters and model clients.

use std::time::Duration;

use reqwest::{Client, Url};

pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 10;

pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(user_agent)
        .build()
}

/// Parses `base_url` with exactly one trailing slash, so `Url::join` appends
/// to its path instead of replacing the last segment.
pub(crate) fn normalise_base_url(base_url: &str) -> Result<Url, BaseUrlError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| BaseUrlError {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct BaseUrlError {
    pub(crate) url: String,
    pub(crate) reason: String,
}

impl From<BaseUrlError> for crate::error::ModelError {
    fn from(err: BaseUrlError) -> Self {
        Self::InvalidBaseUrl {
            url: err.url,
            reason: err.reason,
        }
    }
}

impl From<BaseUrlError> for crate::error::SourceError {
    fn from(err: BaseUrlError) -> Self {
        Self::InvalidBaseUrl {
            url: err.url,
            reason: err.reason,
        }
    }
}

/// Truncates a response body for an error message.
pub(crate) fn snippet(body: &str) -> String {
    const MAX_CHARS: usize = 300;
    if body.chars().count() <= MAX_CHARS {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}
