use colored::Colorize;
use skysync_api::{ApiClient, ApiContext, Credentials, GcloudSecrets, Reconciler};
use skysync_core::{ConfigError, Manifest, MetadataKind, load_manifest_file};
use std::path::PathBuf;

pub async fn handle(
    metadata_type: Option<String>,
    path: Option<PathBuf>,
    environment_name: Option<String>,
    project_id: Option<String>,
    webserver_url: String,
    pause_all: bool,
) -> anyhow::Result<()> {
    let (data, project_id, environment_name, kind): (
        Option<Manifest>,
        Option<String>,
        String,
        MetadataKind,
    ) = match (&path, &metadata_type) {
        (Some(path), None) => {
            let loaded =
                load_manifest_file(path, project_id.as_deref(), environment_name.as_deref())?;
            (
                Some(loaded.data),
                loaded.project_id,
                loaded.environment_name,
                loaded.kind,
            )
        }
        (None, Some(kind_raw)) => {
            let kind: MetadataKind = kind_raw.parse()?;
            let environment_name =
                environment_name.ok_or(ConfigError::MissingEnvironmentName)?;
            (None, project_id, environment_name, kind)
        }
        _ => anyhow::bail!("provide exactly one of --metadata-type or --path"),
    };

    let ctx = ApiContext {
        webserver_url,
        environment_name,
        project_id,
    };
    let secrets = GcloudSecrets::new(ctx.project_id.clone());
    let credentials = Credentials::resolve(&secrets).await?;
    let client = ApiClient::new(&ctx, credentials)?;

    let reconciler = Reconciler::new(&client, &secrets, &ctx).with_pause_all(pause_all);
    reconciler.apply(kind, data.as_ref()).await?;

    println!(
        "{} applied {} metadata to {}",
        "✓".green(),
        kind,
        ctx.environment_name.cyan()
    );
    Ok(())
}
