//! DAG read path
//!
//! Listing DAGs is more than draining pagination: the environment's
//! import-error counter gates the whole read, ownership and routing are
//! derived from tags, and locally-managed duration limits from the DAG
//! manifest are overlaid on the remote answer.

use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Tags marking a DAG as part of a critical pipeline path.
pub const TAGS_CRITICAL_PATH: [&str; 2] =
    ["latest_pipeline:critical_path", "batch_pipeline:critical_path"];

/// Owner entry emitted by the scheduler for unowned DAGs.
const DEFAULT_OWNER: &str = "airflow";
/// Team that inherits DAGs with no real owner.
const FALLBACK_OWNER: &str = "data-infra";
/// Routing value for DAGs with no environment tag.
const ENV_ALL: &str = "env_all";

/// Per-DAG status assembled from the remote listing and the local
/// manifest overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagStatus {
    pub owners: Vec<String>,
    pub is_critical_path: bool,
    pub is_paused: bool,
    pub target_environments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_task_duration_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dag_duration_minutes: Option<u64>,
}

/// Reads DAG metadata from one target environment.
pub struct DagReader<'a> {
    client: &'a ApiClient,
    fail_on_import_error: bool,
}

impl<'a> DagReader<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            fail_on_import_error: true,
        }
    }

    /// Allow reading even when the environment reports import errors.
    /// Off by default: broken imports mean the listing would be wrong.
    pub fn with_fail_on_import_error(mut self, fail_on_import_error: bool) -> Self {
        self.fail_on_import_error = fail_on_import_error;
        self
    }

    /// Full read path: import-error gate, paginated listing, tag
    /// derivation, local manifest overlay.
    pub async fn read(&self, dag_manifest: &Path) -> Result<BTreeMap<String, DagStatus>> {
        let limits = extract_custom_limits(dag_manifest)?;

        let import_errors = self.import_error_count().await?;
        if import_errors != 0 && self.fail_on_import_error {
            return Err(ApiError::ImportErrors(import_errors));
        }

        let items = self.client.paginate("dags", "dags").await?;
        let env_tag = Regex::new(r"env_.*").unwrap();

        let mut results = BTreeMap::new();
        for item in items {
            let dag: ApiDag = serde_json::from_value(item)?;
            let status = derive_status(&dag, &env_tag);
            results.insert(dag.dag_id, status);
        }

        for (dag_id, limits) in limits {
            if let Some(status) = results.get_mut(&dag_id) {
                status.max_task_duration_minutes = limits.max_task_duration_minutes;
                status.max_dag_duration_minutes = limits.max_dag_duration_minutes;
            }
        }

        Ok(results)
    }

    async fn import_error_count(&self) -> Result<u64> {
        let body = self.client.get_json("importErrors", &[]).await?;
        body.get("total_entries")
            .and_then(Value::as_u64)
            .ok_or_else(|| ApiError::Malformed {
                url: "importErrors".to_string(),
                field: "total_entries",
            })
    }
}

fn derive_status(dag: &ApiDag, env_tag: &Regex) -> DagStatus {
    let owners: Vec<String> = dag
        .owners
        .iter()
        .map(|o| o.trim().to_string())
        .filter(|o| o != DEFAULT_OWNER)
        .collect();
    let owners = if owners.is_empty() {
        vec![FALLBACK_OWNER.to_string()]
    } else {
        owners
    };

    let tag_values: Vec<&str> = dag.tags.iter().map(|t| t.name.as_str()).collect();

    let target_environments = tag_values
        .iter()
        .filter(|t| env_tag.is_match(t))
        .copied()
        .collect::<Vec<_>>()
        .join(",");
    let target_environments = if target_environments.is_empty() {
        // A DAG with no designated environment is assumed to run everywhere.
        ENV_ALL.to_string()
    } else {
        target_environments
    };

    let is_critical_path = tag_values
        .iter()
        .any(|t| TAGS_CRITICAL_PATH.contains(t));

    DagStatus {
        owners,
        is_critical_path,
        is_paused: dag.is_paused,
        target_environments,
        max_task_duration_minutes: None,
        max_dag_duration_minutes: None,
    }
}

/// Pull the locally-managed duration limits out of a DAG manifest,
/// dropping entries that set none of them.
fn extract_custom_limits(path: &Path) -> Result<BTreeMap<String, CustomLimits>> {
    let raw = std::fs::read_to_string(path).map_err(skysync_core::ConfigError::from)?;
    let entries: BTreeMap<String, CustomLimits> = serde_json::from_str(&raw)?;
    Ok(entries
        .into_iter()
        .filter(|(_, limits)| {
            limits.max_task_duration_minutes.is_some() || limits.max_dag_duration_minutes.is_some()
        })
        .collect())
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiDag {
    dag_id: String,
    #[serde(default)]
    owners: Vec<String>,
    #[serde(default)]
    tags: Vec<ApiDagTag>,
    #[serde(default)]
    is_paused: bool,
}

#[derive(Debug, Deserialize)]
struct ApiDagTag {
    name: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct CustomLimits {
    #[serde(default)]
    max_task_duration_minutes: Option<u64>,
    #[serde(default)]
    max_dag_duration_minutes: Option<u64>,
}
