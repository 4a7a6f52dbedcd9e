//! cinegridd: the Cinegrid daemon.
//!
//! One binary runs any of the three services, or all of them at once:
//! - `metadata`: movie metadata store
//! - `rating`: rating aggregation (optionally ingesting a JSON-lines feed)
//! - `movie`: composes metadata and ratings found through the registry
//! - `standalone`: all three in one process sharing a memory registry
//!
//! Each service registers itself under a fresh instance id, heartbeats while
//! it runs, and deregisters on Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! cinegridd --registry consul metadata --port 8081
//! cinegridd --config cinegrid.toml movie
//! cinegridd standalone
//! ```

mod service;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cinegrid_core::{CinegridConfig, IngestConfig, RegistryBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::service::{ServiceKind, StandalonePorts};

const DEFAULT_LOG_FILTER: &str = "info,cinegridd=debug,cinegrid=debug";

#[derive(Parser)]
#[command(name = "cinegridd", about = "Cinegrid movie services daemon")]
struct Cli {
    /// Path to a cinegrid.toml configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry backend: memory or consul.
    #[arg(long, global = true)]
    registry: Option<RegistryBackend>,

    /// Consul agent address (host:port).
    #[arg(long, global = true)]
    consul_address: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on and advertise.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the metadata service.
    Metadata(ServeArgs),

    /// Run the rating service.
    Rating {
        #[command(flatten)]
        serve: ServeArgs,

        /// JSON-lines file of rating events to ingest at start.
        #[arg(long)]
        ingest: Option<PathBuf>,
    },

    /// Run the movie service.
    Movie(ServeArgs),

    /// Run all three services in one process.
    Standalone {
        #[arg(long, default_value_t = ServiceKind::Metadata.default_port())]
        metadata_port: u16,

        #[arg(long, default_value_t = ServiceKind::Rating.default_port())]
        rating_port: u16,

        #[arg(long, default_value_t = ServiceKind::Movie.default_port())]
        movie_port: u16,

        /// JSON-lines file of rating events to ingest at start.
        #[arg(long)]
        ingest: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_config(&cli)?;
    info!(backend = %config.registry.backend, "configuration loaded");

    match cli.command {
        Command::Metadata(_) => service::run_service(ServiceKind::Metadata, config).await,
        Command::Rating { .. } => service::run_service(ServiceKind::Rating, config).await,
        Command::Movie(_) => service::run_service(ServiceKind::Movie, config).await,
        Command::Standalone {
            metadata_port,
            rating_port,
            movie_port,
            ..
        } => {
            let ports = StandalonePorts {
                metadata: metadata_port,
                rating: rating_port,
                movie: movie_port,
            };
            service::run_standalone(config, ports).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Read the config file (if any), then apply command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<CinegridConfig> {
    let mut config = match &cli.config {
        Some(path) => CinegridConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("load {}: {e}", path.display()))?,
        None => CinegridConfig::default(),
    };
    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut CinegridConfig, cli: &Cli) {
    if let Some(backend) = cli.registry {
        config.registry.backend = backend;
    }
    if let Some(address) = &cli.consul_address {
        config.registry.consul_address = address.clone();
    }

    let (serve, ingest) = match &cli.command {
        Command::Metadata(serve) | Command::Movie(serve) => (Some(serve), None),
        Command::Rating { serve, ingest } => (Some(serve), ingest.as_ref()),
        Command::Standalone { ingest, .. } => (None, ingest.as_ref()),
    };
    if let Some(serve) = serve {
        if let Some(host) = &serve.host {
            config.server.host = Some(host.clone());
        }
        if let Some(port) = serve.port {
            config.server.port = Some(port);
        }
    }
    if let Some(path) = ingest {
        config.ingest = Some(IngestConfig {
            path: path.display().to_string(),
        });
    }
}
