//! API error types

use skysync_core::MetadataKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{method} {url} returned {status}: {body}")]
    Remote {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed response from {url}: missing field {field}")]
    Malformed { url: String, field: &'static str },

    #[error("{0} import errors detected on the target environment")]
    ImportErrors(u64),

    #[error("operation {operation} is not supported for {kind}")]
    Unsupported {
        kind: MetadataKind,
        operation: &'static str,
    },

    #[error("secret {name} could not be read: {reason}")]
    Secret { name: String, reason: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] skysync_core::ConfigError),
}

pub type Result<T> = std::result::Result<T, ApiError>;
