mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use skysync_api::ApiError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skysync")]
#[command(about = "Reconcile an orchestrator environment's metadata against declarative manifests", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List metadata currently present on the target environment
    List {
        /// The type of metadata to list (pools, connections, variables, roles, dags)
        metadata_type: String,
        /// The name of the target environment
        #[arg(long)]
        environment_name: String,
        /// The project ID of the target environment
        #[arg(long)]
        project_id: String,
        /// Webserver URL of the target environment
        #[arg(long, env = "SKYSYNC_WEBSERVER_URL")]
        webserver_url: String,
        /// If listing DAGs, path to the manifest holding locally-managed fields
        #[arg(long)]
        dag_manifest: Option<PathBuf>,
        /// Continue even when the environment reports DAG import errors
        #[arg(long)]
        ignore_import_errors: bool,
    },
    /// Apply a metadata manifest to the target environment
    Apply {
        /// The type of metadata to apply; its manifest comes from the
        /// kind's own source (connections: secret store)
        #[arg(long, conflicts_with = "path")]
        metadata_type: Option<String>,
        /// The path to a metadata manifest to apply
        #[arg(long)]
        path: Option<PathBuf>,
        /// The name of the target environment
        #[arg(long)]
        environment_name: Option<String>,
        /// The project ID of the target environment
        #[arg(long)]
        project_id: Option<String>,
        /// Webserver URL of the target environment
        #[arg(long, env = "SKYSYNC_WEBSERVER_URL")]
        webserver_url: String,
        /// Pause all DAGs in the target environment
        #[arg(long)]
        pause_all: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::List {
            metadata_type,
            environment_name,
            project_id,
            webserver_url,
            dag_manifest,
            ignore_import_errors,
        } => {
            commands::list::handle(
                &metadata_type,
                environment_name,
                project_id,
                webserver_url,
                dag_manifest,
                ignore_import_errors,
            )
            .await
        }
        Commands::Apply {
            metadata_type,
            path,
            environment_name,
            project_id,
            webserver_url,
            pause_all,
        } => {
            commands::apply::handle(
                metadata_type,
                path,
                environment_name,
                project_id,
                webserver_url,
                pause_all,
            )
            .await
        }
    };

    if let Err(err) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        // Unsupported kind/operation combinations get their own exit
        // code so callers can tell them from real failures (clap owns 2
        // for usage errors).
        let code = match err.downcast_ref::<ApiError>() {
            Some(ApiError::Unsupported { .. }) => 3,
            _ => 1,
        };
        std::process::exit(code);
    }
}
