use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use snapsync::github::repository_name;
use snapsync::restore::RestoreRequest;
use snapsync::store::fragments::{
    bind_commit_sha, list_project_fragments, record_fragment, FragmentRecord,
};
use snapsync::store::Store;
use snapsync::sync::SyncRequest;
use snapsync::{App, Config};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "snapsync")]
#[command(version, about = "Back up sandbox projects to GitHub and restore them")]
struct Cli {
    /// Config file (defaults to ~/.snapsync/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway and the workflow workers
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Back up one project now
    Sync {
        #[arg(long)]
        project: String,
        /// JSON file mapping relative paths to contents
        #[arg(long)]
        files: PathBuf,
        #[arg(long)]
        sandbox_url: String,
        #[arg(long, default_value = "")]
        title: String,
        /// Fragment that should record the resulting commit
        #[arg(long)]
        fragment: Option<String>,
    },
    /// Restore a fragment into a new sandbox now
    Restore {
        #[arg(long)]
        project: String,
        #[arg(long)]
        fragment: String,
    },
    /// Show a queued event's status
    Status { event_id: String },
    /// Record or list generated fragments
    Fragment {
        #[command(subcommand)]
        command: FragmentCommands,
    },
    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum FragmentCommands {
    /// Record a fragment, creating its project on first use
    Add {
        #[arg(long)]
        project: String,
        #[arg(long)]
        title: String,
        /// JSON file mapping relative paths to contents
        #[arg(long)]
        files: PathBuf,
        #[arg(long)]
        sandbox_url: Option<String>,
        /// Project name used when the project is new
        #[arg(long)]
        name: Option<String>,
    },
    /// List a project's fragments, oldest first
    List {
        #[arg(long)]
        project: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective config with secrets masked
    Show,
    /// Print the JSON Schema of config.toml
    Schema,
}

fn read_files(path: &Path) -> Result<BTreeMap<String, String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).context("Files must be a JSON object of path to content")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    snapsync::observability::init_tracing(if cli.verbose {
        "snapsync=debug"
    } else {
        "snapsync=info"
    });

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Show => print!("{}", config.redacted_toml()?),
            ConfigCommands::Schema => println!("{}", snapsync::config::config_json_schema()?),
        },
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            let app = App::build(config)?;
            app.engine.start()?;
            snapsync::gateway::run_gateway(app.gateway_state(), &app.config.gateway).await?;
        }
        Commands::Sync {
            project,
            files,
            sandbox_url,
            title,
            fragment,
        } => {
            let request = SyncRequest {
                project_id: project,
                files: read_files(&files)?,
                sandbox_url,
                title,
                fragment_id: fragment,
            };
            let app = App::build(config)?;
            let report = app.synchronizer.sync(&request).await;
            print_json(&report)?;
            anyhow::ensure!(report.success, "sync failed");

            if let (Some(fragment_id), Some(sha)) = (&request.fragment_id, &report.commit_sha) {
                let repo = repository_name(&request.project_id);
                let bound = app
                    .store
                    .with_conn(|conn| bind_commit_sha(conn, fragment_id, &repo, sha))?;
                if !bound {
                    tracing::warn!(%fragment_id, "fragment already has a commit sha or does not exist");
                }
            }
        }
        Commands::Restore { project, fragment } => {
            let app = App::build(config)?;
            let report = app
                .orchestrator
                .restore(&RestoreRequest {
                    project_id: project,
                    fragment_id: fragment,
                })
                .await;
            print_json(&report)?;
            anyhow::ensure!(report.success, "restore failed");
        }
        Commands::Status { event_id } => {
            let app = App::build(config)?;
            print_json(&app.engine.event_status(&event_id)?)?;
        }
        Commands::Fragment { command } => {
            let store = Store::open(&config.store.resolved_db_path())?;
            match command {
                FragmentCommands::Add {
                    project,
                    title,
                    files,
                    sandbox_url,
                    name,
                } => {
                    let record = FragmentRecord {
                        project_id: project,
                        project_name: name,
                        message: None,
                        title,
                        files: read_files(&files)?,
                        sandbox_url,
                    };
                    record.validate()?;
                    let fragment = store.with_conn(|conn| record_fragment(conn, &record))?;
                    print_json(&fragment)?;
                }
                FragmentCommands::List { project } => {
                    let fragments =
                        store.with_conn(|conn| list_project_fragments(conn, &project))?;
                    print_json(&fragments)?;
                }
            }
        }
    }

    Ok(())
}
