use std::path::PathBuf;

use artcrm_core::StoreError;
use thiserror::Error;

/// Failures inside a source adapter. Never leaves the adapter: the
/// [`SourceAdapter`](crate::SourceAdapter) contract turns these into an
/// empty result and a log line.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} API returned status {status}: {message}")]
    Api {
        source_name: &'static str,
        status: String,
        message: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0} is not set")]
    MissingApiKey(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} returned status {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected {backend} response: {reason}")]
    MalformedResponse {
        backend: &'static str,
        reason: String,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to write scout artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize scout artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("no lead source enabled: enable at least one of Google Places or OpenStreetMap")]
    NoSourcesEnabled,

    #[error("invalid scout request: {0}")]
    InvalidRequest(String),

    #[error("contact store failed while resolving leads: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
