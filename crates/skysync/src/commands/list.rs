use colored::Colorize;
use skysync_api::{ApiClient, ApiContext, ApiError, Credentials, DagReader, GcloudSecrets, Reconciler};
use skysync_core::{ConfigError, MetadataKind};
use std::path::PathBuf;

pub async fn handle(
    metadata_type: &str,
    environment_name: String,
    project_id: String,
    webserver_url: String,
    dag_manifest: Option<PathBuf>,
    ignore_import_errors: bool,
) -> anyhow::Result<()> {
    let kind: MetadataKind = metadata_type.parse()?;

    // Unsupported combinations fail before any credential or network work.
    if kind == MetadataKind::Roles {
        return Err(ApiError::Unsupported {
            kind,
            operation: "list",
        }
        .into());
    }

    let ctx = ApiContext {
        webserver_url,
        environment_name,
        project_id: Some(project_id),
    };
    let secrets = GcloudSecrets::new(ctx.project_id.clone());
    let credentials = Credentials::resolve(&secrets).await?;
    let client = ApiClient::new(&ctx, credentials)?;

    match kind {
        MetadataKind::Dags => {
            let path = dag_manifest.ok_or(ConfigError::MissingDagManifest)?;
            let reader = DagReader::new(&client).with_fail_on_import_error(!ignore_import_errors);
            let statuses = reader.read(&path).await?;
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
        _ => {
            let reconciler = Reconciler::new(&client, &secrets, &ctx);
            let names = reconciler.list(kind).await?;
            println!("{} in {}:", heading(kind), ctx.environment_name.cyan());
            for name in names {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn heading(kind: MetadataKind) -> &'static str {
    match kind {
        MetadataKind::Pools => "Pools",
        MetadataKind::Connections => "Connections",
        MetadataKind::Variables => "Variables",
        MetadataKind::Roles => "Roles",
        MetadataKind::Dags => "Dags",
    }
}
