//! Manifest loading
//!
//! A manifest is a JSON document describing the desired state of one
//! metadata kind in one environment. Identity fields (`project_id`,
//! `environment_name`) live in the document because each manifest is
//! unique to an environment; values supplied on the command line win
//! over the document's.

use crate::error::{ConfigError, Result};
use crate::kind::MetadataKind;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Desired state for one kind: identifier to attribute bag.
pub type Manifest = BTreeMap<String, Value>;

/// A manifest document resolved to the pieces the reconciler needs.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub data: Manifest,
    pub project_id: Option<String>,
    pub environment_name: String,
    pub kind: MetadataKind,
}

/// Load a manifest document from disk.
///
/// The desired-state mapping is the nested `data` object when present,
/// otherwise the whole document. `metadata_type` defaults to `dags`,
/// the one kind whose manifests don't carry the field.
pub fn load_manifest_file(
    path: &Path,
    project_override: Option<&str>,
    environment_override: Option<&str>,
) -> Result<LoadedManifest> {
    let raw = std::fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&raw)?;

    let Some(doc) = doc.as_object() else {
        return Err(ConfigError::InvalidManifest(format!(
            "{} does not contain a JSON object",
            path.display()
        )));
    };

    let field = |name: &str| doc.get(name).and_then(Value::as_str).map(str::to_string);

    let project_id = project_override.map(str::to_string).or_else(|| field("project_id"));
    let environment_name = environment_override
        .map(str::to_string)
        .or_else(|| field("environment_name"))
        .ok_or(ConfigError::MissingEnvironmentName)?;

    let kind: MetadataKind = field("metadata_type").as_deref().unwrap_or("dags").parse()?;

    let data = match doc.get("data") {
        Some(Value::Object(nested)) => nested.clone(),
        Some(other) => {
            return Err(ConfigError::InvalidManifest(format!(
                "data must be a JSON object, got {other}"
            )));
        }
        None => doc.clone(),
    };

    tracing::debug!(
        "loaded {} manifest for {} ({} entries)",
        kind,
        environment_name,
        data.len()
    );

    Ok(LoadedManifest {
        data: data.into_iter().collect(),
        project_id,
        environment_name,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_manifest(value: &Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{value}").unwrap();
        file
    }

    #[test]
    fn test_nested_data_and_explicit_kind() {
        let file = write_manifest(&json!({
            "project_id": "analytics-prod",
            "environment_name": "prod",
            "metadata_type": "pools",
            "data": {
                "etl_pool": {"slots": 16},
                "backfill_pool": {"slots": 4}
            }
        }));

        let loaded = load_manifest_file(file.path(), None, None).unwrap();
        assert_eq!(loaded.kind, MetadataKind::Pools);
        assert_eq!(loaded.project_id.as_deref(), Some("analytics-prod"));
        assert_eq!(loaded.environment_name, "prod");
        assert_eq!(loaded.data.len(), 2);
        assert_eq!(loaded.data["etl_pool"]["slots"], json!(16));
    }

    #[test]
    fn test_kind_defaults_to_dags() {
        let file = write_manifest(&json!({
            "environment_name": "dev",
            "data": {"nightly_load": {"is_paused": false}}
        }));

        let loaded = load_manifest_file(file.path(), None, None).unwrap();
        assert_eq!(loaded.kind, MetadataKind::Dags);
    }

    #[test]
    fn test_whole_document_when_data_missing() {
        let file = write_manifest(&json!({
            "environment_name": "dev",
            "metadata_type": "variables",
            "feature_flag": "on"
        }));

        let loaded = load_manifest_file(file.path(), None, None).unwrap();
        assert_eq!(loaded.kind, MetadataKind::Variables);
        // Without a nested data object the whole document is the manifest.
        assert!(loaded.data.contains_key("feature_flag"));
        assert!(loaded.data.contains_key("environment_name"));
    }

    #[test]
    fn test_cli_overrides_win() {
        let file = write_manifest(&json!({
            "project_id": "from-file",
            "environment_name": "from-file",
            "metadata_type": "variables",
            "data": {}
        }));

        let loaded =
            load_manifest_file(file.path(), Some("from-cli"), Some("stg")).unwrap();
        assert_eq!(loaded.project_id.as_deref(), Some("from-cli"));
        assert_eq!(loaded.environment_name, "stg");
    }

    #[test]
    fn test_missing_environment_name() {
        let file = write_manifest(&json!({
            "metadata_type": "pools",
            "data": {}
        }));

        let err = load_manifest_file(file.path(), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvironmentName));
    }

    #[test]
    fn test_unknown_kind() {
        let file = write_manifest(&json!({
            "environment_name": "dev",
            "metadata_type": "datasets",
            "data": {}
        }));

        let err = load_manifest_file(file.path(), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKind(k) if k == "datasets"));
    }

    #[test]
    fn test_non_object_root() {
        let file = write_manifest(&json!(["not", "an", "object"]));
        let err = load_manifest_file(file.path(), None, Some("dev")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidManifest(_)));
    }
}
