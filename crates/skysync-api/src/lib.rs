//! Orchestrator API access and reconciliation for skysync
//!
//! This crate talks to one target environment's REST API and makes its
//! metadata match a desired-state manifest: poll, diff, delete the
//! extras, upsert the rest. Kind-specific policy (pruning, protected
//! identifiers, create fallback) lives in `skysync-core`'s kind table.

pub mod client;
pub mod dags;
pub mod error;
pub mod reconcile;
pub mod secrets;

// Re-exports
pub use client::{ApiClient, ApiContext, Credentials, PAGE_SIZE};
pub use dags::{DagReader, DagStatus};
pub use error::{ApiError, Result};
pub use reconcile::Reconciler;
pub use secrets::{GcloudSecrets, SecretStore};
