//! End-to-end runs of the binary against a mock orchestrator API.

use assert_cmd::Command;
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use predicates::str::contains;
use serde_json::json;
use std::fs;
use tempfile::tempdir;

fn skysync_cmd(server: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("skysync").unwrap();
    cmd.env("SKYSYNC_API_PASSWORD", "test-password")
        .env("SKYSYNC_WEBSERVER_URL", server.base_url());
    cmd
}

#[test]
fn list_pools_prints_names() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/pools")
            .query_param("offset", "0");
        then.status(200)
            .json_body(json!({"pools": [{"name": "default_pool"}, {"name": "etl_pool"}]}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/pools")
            .query_param("offset", "100");
        then.status(200).json_body(json!({"pools": []}));
    });

    skysync_cmd(&server)
        .args([
            "list",
            "pools",
            "--environment-name",
            "dev",
            "--project-id",
            "proj",
        ])
        .assert()
        .success()
        .stdout(contains("Pools in dev:"))
        .stdout(contains("default_pool"))
        .stdout(contains("etl_pool"));
}

#[test]
fn apply_pool_manifest_reconciles_remote_state() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/pools")
            .query_param("offset", "0");
        then.status(200)
            .json_body(json!({"pools": [{"name": "stale_pool"}]}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/pools")
            .query_param("offset", "100");
        then.status(200).json_body(json!({"pools": []}));
    });
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/api/v1/pools/stale_pool");
        then.status(204);
    });
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/api/v1/pools/etl_pool")
            .json_body(json!({"name": "etl_pool", "slots": 8}));
        then.status(404);
    });
    let post = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/pools")
            .json_body(json!({"name": "etl_pool", "slots": 8}));
        then.status(200).json_body(json!({"name": "etl_pool"}));
    });

    let tmp = tempdir().unwrap();
    let manifest = tmp.path().join("pools.json");
    fs::write(
        &manifest,
        json!({
            "project_id": "proj",
            "environment_name": "dev",
            "metadata_type": "pools",
            "data": {"etl_pool": {"slots": 8}}
        })
        .to_string(),
    )
    .unwrap();

    skysync_cmd(&server)
        .args(["apply", "--path", manifest.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("applied pools metadata to dev"));

    delete.assert();
    patch.assert();
    post.assert();
}

#[test]
fn apply_variable_manifest_patches_without_pruning() {
    let server = MockServer::start();
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/api/v1/variables/feature_flag")
            .json_body(json!({"key": "feature_flag", "value": "on"}));
        then.status(200).json_body(json!({}));
    });
    let any_delete = server.mock(|when, then| {
        when.method(DELETE).path_contains("/api/v1/");
        then.status(204);
    });

    let tmp = tempdir().unwrap();
    let manifest = tmp.path().join("variables.json");
    fs::write(
        &manifest,
        json!({
            "project_id": "proj",
            "environment_name": "dev",
            "metadata_type": "variables",
            "data": {"feature_flag": "on"}
        })
        .to_string(),
    )
    .unwrap();

    skysync_cmd(&server)
        .args(["apply", "--path", manifest.to_str().unwrap()])
        .assert()
        .success();

    patch.assert();
    assert_eq!(any_delete.hits(), 0);
}

#[test]
fn apply_dag_manifest_with_pause_all_forces_paused() {
    let server = MockServer::start();
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/api/v1/dags/hourly_load")
            .query_param("update_mask", "is_paused")
            .json_body(json!({"is_paused": true}));
        then.status(200).json_body(json!({}));
    });

    let tmp = tempdir().unwrap();
    let manifest = tmp.path().join("dags.json");
    fs::write(
        &manifest,
        json!({
            "project_id": "proj",
            "environment_name": "dev",
            "data": {"hourly_load": {"is_paused": false, "owners": ["alice"]}}
        })
        .to_string(),
    )
    .unwrap();

    skysync_cmd(&server)
        .args(["apply", "--path", manifest.to_str().unwrap(), "--pause-all"])
        .assert()
        .success();

    patch.assert();
}

#[test]
fn apply_aborts_on_unexpected_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(PATCH).path("/api/v1/variables/feature_flag");
        then.status(500).body("boom");
    });

    let tmp = tempdir().unwrap();
    let manifest = tmp.path().join("variables.json");
    fs::write(
        &manifest,
        json!({
            "project_id": "proj",
            "environment_name": "dev",
            "metadata_type": "variables",
            "data": {"feature_flag": "on"}
        })
        .to_string(),
    )
    .unwrap();

    skysync_cmd(&server)
        .args(["apply", "--path", manifest.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("500"));
}

#[test]
fn list_dags_aborts_on_import_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/importErrors");
        then.status(200).json_body(json!({"total_entries": 3}));
    });
    let listing = server.mock(|when, then| {
        when.method(GET).path("/api/v1/dags");
        then.status(200).json_body(json!({"dags": []}));
    });

    let tmp = tempdir().unwrap();
    let manifest = tmp.path().join("dags.json");
    fs::write(&manifest, json!({}).to_string()).unwrap();

    skysync_cmd(&server)
        .args([
            "list",
            "dags",
            "--environment-name",
            "dev",
            "--project-id",
            "proj",
            "--dag-manifest",
            manifest.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("import errors"));

    assert_eq!(listing.hits(), 0);
}

#[test]
fn list_dags_renders_derived_metadata() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/importErrors");
        then.status(200).json_body(json!({"total_entries": 0}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/dags")
            .query_param("offset", "0");
        then.status(200).json_body(json!({"dags": [{
            "dag_id": "hourly_load",
            "owners": ["airflow"],
            "tags": [{"name": "env_prod"}],
            "is_paused": false
        }]}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/dags")
            .query_param("offset", "100");
        then.status(200).json_body(json!({"dags": []}));
    });

    let tmp = tempdir().unwrap();
    let manifest = tmp.path().join("dags.json");
    fs::write(
        &manifest,
        json!({"hourly_load": {"max_task_duration_minutes": 45}}).to_string(),
    )
    .unwrap();

    skysync_cmd(&server)
        .args([
            "list",
            "dags",
            "--environment-name",
            "dev",
            "--project-id",
            "proj",
            "--dag-manifest",
            manifest.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("hourly_load"))
        .stdout(contains("data-infra"))
        .stdout(contains("env_prod"))
        .stdout(contains("max_task_duration_minutes"));
}

#[test]
fn list_dags_requires_dag_manifest() {
    let server = MockServer::start();

    skysync_cmd(&server)
        .args([
            "list",
            "dags",
            "--environment-name",
            "dev",
            "--project-id",
            "proj",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("--dag-manifest"));
}
