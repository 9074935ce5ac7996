//! Secret store access
//!
//! Wraps the gcloud CLI for Secret Manager reads. The store is a seam:
//! the reconciler only sees the trait, so tests substitute an in-memory
//! implementation.

use crate::error::{ApiError, Result};
use async_trait::async_trait;
use skysync_core::ConfigError;
use std::process::Stdio;
use tokio::process::Command;

/// Read-only access to named secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<String>;
}

/// Secret store backed by the gcloud CLI.
pub struct GcloudSecrets {
    project_id: Option<String>,
}

impl GcloudSecrets {
    pub fn new(project_id: Option<String>) -> Self {
        Self { project_id }
    }
}

#[async_trait]
impl SecretStore for GcloudSecrets {
    async fn get_secret(&self, name: &str) -> Result<String> {
        let project = self
            .project_id
            .as_deref()
            .ok_or(ConfigError::MissingProjectId)?;

        let mut cmd = Command::new("gcloud");
        cmd.args([
            "secrets",
            "versions",
            "access",
            "latest",
            "--secret",
            name,
            "--project",
            project,
        ]);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(
            "Running: gcloud secrets versions access latest --secret {} --project {}",
            name,
            project
        );

        let output = cmd.output().await.map_err(|e| ApiError::Secret {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ApiError::Secret {
                name: name.to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_project_fails_before_spawning() {
        let store = GcloudSecrets::new(None);
        let err = store.get_secret("anything").await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Config(ConfigError::MissingProjectId)
        ));
    }
}
