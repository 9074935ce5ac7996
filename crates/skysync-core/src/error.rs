//! Configuration error types

use thiserror::Error;

/// Errors raised while resolving manifests and target identity,
/// before any request is issued.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment name is required; pass --environment-name or set it in the manifest")]
    MissingEnvironmentName,

    #[error("project id is required for secret access; pass --project-id or set it in the manifest")]
    MissingProjectId,

    #[error("unknown metadata type: {0}")]
    UnknownKind(String),

    #[error("metadata type {0} requires a manifest file; pass --path")]
    MissingManifest(String),

    #[error("listing dags requires --dag-manifest")]
    MissingDagManifest,

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("manifest entry {identifier} is missing required field {field}")]
    MissingAttribute { identifier: String, field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
