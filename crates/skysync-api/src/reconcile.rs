//! Reconciliation engine
//!
//! Converts a desired-state manifest plus a freshly polled remote
//! listing into the minimal sequence of delete and upsert calls.
//! Policy differences between kinds (what gets pruned, what stays
//! protected, how payloads are shaped) come from the kind table; the
//! loops here stay generic and fail fast on any unexpected status.

use crate::client::{ApiClient, ApiContext};
use crate::error::{ApiError, Result};
use crate::secrets::SecretStore;
use serde_json::{Map, Value, json};
use skysync_core::{ConfigError, Manifest, MetadataKind};
use std::collections::BTreeSet;

/// Drives `list` and `apply` for every metadata kind against one
/// target environment.
pub struct Reconciler<'a> {
    client: &'a ApiClient,
    secrets: &'a dyn SecretStore,
    ctx: &'a ApiContext,
    pause_all: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(client: &'a ApiClient, secrets: &'a dyn SecretStore, ctx: &'a ApiContext) -> Self {
        Self {
            client,
            secrets,
            ctx,
            pause_all: false,
        }
    }

    /// Force every DAG's applied paused state to true, regardless of the
    /// manifest.
    pub fn with_pause_all(mut self, pause_all: bool) -> Self {
        self.pause_all = pause_all;
        self
    }

    /// List the identifiers currently present for a kind. Roles don't
    /// implement listing.
    pub async fn list(&self, kind: MetadataKind) -> Result<Vec<String>> {
        if kind == MetadataKind::Roles {
            return Err(ApiError::Unsupported {
                kind,
                operation: "list",
            });
        }
        self.client.list_identifiers(kind).await
    }

    /// Reconcile the target environment's state for one kind against a
    /// manifest. Connections ignore the supplied manifest and read their
    /// own from the secret store; every other kind requires one.
    pub async fn apply(&self, kind: MetadataKind, manifest: Option<&Manifest>) -> Result<()> {
        match kind {
            MetadataKind::Connections => self.apply_connections().await,
            MetadataKind::Pools => self.apply_pools(required(kind, manifest)?).await,
            MetadataKind::Variables => self.apply_variables(required(kind, manifest)?).await,
            MetadataKind::Roles => self.apply_roles(required(kind, manifest)?).await,
            MetadataKind::Dags => self.apply_dags(required(kind, manifest)?).await,
        }
    }

    /// Delete every remote identifier that is neither in the manifest
    /// nor protected.
    async fn prune(&self, kind: MetadataKind, polled: &[String], manifest: &Manifest) -> Result<()> {
        let desired: BTreeSet<&str> = manifest.keys().map(String::as_str).collect();
        for id in polled {
            if desired.contains(id.as_str()) || kind.protected().contains(&id.as_str()) {
                continue;
            }
            tracing::info!("Deleting {} from {}", id, kind);
            self.client.delete(kind, id).await?;
        }
        Ok(())
    }

    /// Connections carry credentials, so the manifest never lives in a
    /// local file; it comes from a secret namespaced by environment.
    async fn apply_connections(&self) -> Result<()> {
        let polled = self.client.list_identifiers(MetadataKind::Connections).await?;

        let secret_name = format!("{}-connections", self.ctx.environment_name);
        let raw = self.secrets.get_secret(&secret_name).await?;
        let manifest: Manifest = serde_json::from_str(&raw)?;

        self.prune(MetadataKind::Connections, &polled, &manifest).await?;

        for (name, attrs) in &manifest {
            tracing::info!("Updating {}", name);
            let mut payload = entry_object(MetadataKind::Connections, name, attrs)?.clone();
            payload.insert("connection_id".to_string(), json!(name));
            // The remote API rejects null-valued fields, which connection
            // exports emit for anything unset.
            let payload = strip_nulls(payload);
            self.client
                .upsert(MetadataKind::Connections, name, &Value::Object(payload))
                .await?;
        }
        Ok(())
    }

    async fn apply_pools(&self, manifest: &Manifest) -> Result<()> {
        let polled = self.client.list_identifiers(MetadataKind::Pools).await?;

        self.prune(MetadataKind::Pools, &polled, manifest).await?;

        for (name, attrs) in manifest {
            tracing::info!("Updating {}", name);
            let mut payload = entry_object(MetadataKind::Pools, name, attrs)?.clone();
            payload.insert("name".to_string(), json!(name));
            self.client
                .upsert(MetadataKind::Pools, name, &Value::Object(payload))
                .await?;
        }
        Ok(())
    }

    /// Variables are additive: nothing is pruned, and PATCH alone is
    /// create-or-update for this kind.
    async fn apply_variables(&self, manifest: &Manifest) -> Result<()> {
        for (key, value) in manifest {
            tracing::info!("Updating variable {}", key);
            let payload = json!({"key": key, "value": value});
            self.client
                .upsert(MetadataKind::Variables, key, &payload)
                .await?;
        }
        Ok(())
    }

    /// Roles are overwrite-only and must already exist on the target.
    async fn apply_roles(&self, manifest: &Manifest) -> Result<()> {
        for (name, attrs) in manifest {
            let actions = attrs.get("actions").ok_or_else(|| {
                ConfigError::MissingAttribute {
                    identifier: name.clone(),
                    field: "actions".to_string(),
                }
            })?;
            tracing::info!("Updating role {}", name);
            let payload = json!({"name": name, "actions": actions});
            self.client
                .upsert(MetadataKind::Roles, name, &payload)
                .await?;
        }
        Ok(())
    }

    /// Only the paused flag is managed; owners, tags and the rest of the
    /// manifest entry stay untouched on the remote side.
    async fn apply_dags(&self, manifest: &Manifest) -> Result<()> {
        for (dag_id, attrs) in manifest {
            let paused = if self.pause_all {
                true
            } else {
                attrs
                    .get("is_paused")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| ConfigError::MissingAttribute {
                        identifier: dag_id.clone(),
                        field: "is_paused".to_string(),
                    })?
            };

            tracing::info!("Setting {} paused: {}", dag_id, paused);
            self.client
                .patch_json(
                    &format!("dags/{dag_id}"),
                    &[("update_mask", "is_paused")],
                    &json!({"is_paused": paused}),
                )
                .await?;
        }
        Ok(())
    }
}

fn required<'m>(kind: MetadataKind, manifest: Option<&'m Manifest>) -> Result<&'m Manifest> {
    manifest.ok_or_else(|| ConfigError::MissingManifest(kind.to_string()).into())
}

fn entry_object<'v>(kind: MetadataKind, id: &str, value: &'v Value) -> Result<&'v Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        ConfigError::InvalidManifest(format!("{kind} entry {id} must be a JSON object")).into()
    })
}

fn strip_nulls(attrs: Map<String, Value>) -> Map<String, Value> {
    attrs.into_iter().filter(|(_, v)| !v.is_null()).collect()
}
