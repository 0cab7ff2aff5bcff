//! Coordinator binary

use clap::{Parser, Subcommand};
use georeplica::{Coordinator, CoordinatorConfig, GeoPoint};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "georeplica-coord")]
#[command(about = "georeplica replication coordinator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start coordinator server
    Serve {
        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Storage node document (JSON list of {id, endpoint, lat, lon})
        #[arg(long)]
        nodes: Option<PathBuf>,

        /// Metadata ledger path
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Reference latitude for nearest lookups
        #[arg(long, requires = "ref_lon", allow_negative_numbers = true)]
        ref_lat: Option<f64>,

        /// Reference longitude for nearest lookups
        #[arg(long, requires = "ref_lat", allow_negative_numbers = true)]
        ref_lon: Option<f64>,

        /// Per-node request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Reject uploads whose body exceeds this many bytes
        #[arg(long)]
        max_upload_bytes: Option<usize>,

        /// Directory served for unmatched paths (upload UI)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            nodes,
            metadata,
            ref_lat,
            ref_lon,
            timeout,
            max_upload_bytes,
            static_dir,
        } => {
            // Load config from file and environment, then override with CLI arguments
            let mut config = CoordinatorConfig::load()?;
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if let Some(nodes) = nodes {
                config.nodes_path = nodes;
            }
            if let Some(metadata) = metadata {
                config.metadata_path = metadata;
            }
            if let (Some(lat), Some(lon)) = (ref_lat, ref_lon) {
                config.reference_point = GeoPoint::new(lat, lon);
            }
            if let Some(timeout) = timeout {
                config.request_timeout_secs = timeout;
            }
            if max_upload_bytes.is_some() {
                config.max_upload_bytes = max_upload_bytes;
            }
            if static_dir.is_some() {
                config.static_dir = static_dir;
            }

            let coord = Coordinator::from_config(config)?;
            coord.serve().await?;
        }
    }

    Ok(())
}
