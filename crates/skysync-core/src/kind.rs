//! Metadata kind policy table
//!
//! The five kinds the reconciler manages are a closed set. Everything
//! kind-specific that the engine needs — API sub-path, identifier field,
//! deletion policy, create fallback, protected identifiers — is answered
//! here so the reconcile loops stay generic.

use crate::error::ConfigError;

/// The kinds of environment metadata skysync manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Pools,
    Connections,
    Variables,
    Roles,
    Dags,
}

impl MetadataKind {
    pub const ALL: [MetadataKind; 5] = [
        MetadataKind::Pools,
        MetadataKind::Connections,
        MetadataKind::Variables,
        MetadataKind::Roles,
        MetadataKind::Dags,
    ];

    /// API sub-path under `/api/v1`. Doubles as the field name holding
    /// the item array in list responses.
    pub fn api_path(&self) -> &'static str {
        match self {
            MetadataKind::Pools => "pools",
            MetadataKind::Connections => "connections",
            MetadataKind::Variables => "variables",
            MetadataKind::Roles => "roles",
            MetadataKind::Dags => "dags",
        }
    }

    /// Field carrying the identifier in listed items.
    pub fn id_field(&self) -> &'static str {
        match self {
            MetadataKind::Pools => "name",
            MetadataKind::Connections => "connection_id",
            MetadataKind::Variables => "key",
            MetadataKind::Roles => "name",
            MetadataKind::Dags => "dag_id",
        }
    }

    /// Whether `apply` deletes remote entries absent from the manifest.
    /// Variables, roles and DAGs are additive/overwrite-only.
    pub fn prunes_extras(&self) -> bool {
        matches!(self, MetadataKind::Pools | MetadataKind::Connections)
    }

    /// Whether a 404 on PATCH falls back to POST. Variables are
    /// create-or-update through PATCH alone; roles must pre-exist.
    pub fn creates_on_missing(&self) -> bool {
        matches!(self, MetadataKind::Pools | MetadataKind::Connections)
    }

    /// Identifiers that must survive reconciliation no matter what the
    /// manifest says.
    pub fn protected(&self) -> &'static [&'static str] {
        match self {
            MetadataKind::Connections => &["airflow_db"],
            _ => &[],
        }
    }
}

impl std::str::FromStr for MetadataKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pools" => Ok(MetadataKind::Pools),
            "connections" => Ok(MetadataKind::Connections),
            "variables" => Ok(MetadataKind::Variables),
            "roles" => Ok(MetadataKind::Roles),
            "dags" => Ok(MetadataKind::Dags),
            other => Err(ConfigError::UnknownKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_path())
    }
}
