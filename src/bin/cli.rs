//! CLI for talking to a running coordinator

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use georeplica::common::{encode_key, format_bytes};
use georeplica::coordinator::http::FILE_ID_HEADER;
use georeplica::{FileRecord, StorageNode};
use reqwest::multipart::{Form, Part};
use reqwest::{redirect, Client, StatusCode};
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(name = "georeplica")]
#[command(about = "georeplica coordinator CLI")]
#[command(version)]
struct Cli {
    /// Coordinator URL
    #[arg(long, default_value = "http://localhost:8000")]
    coordinator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and replicate it to every node
    Upload {
        /// File path
        file: std::path::PathBuf,
    },

    /// List known files
    List,

    /// Show the replica closest to the coordinator's reference point
    Nearest {
        /// File id
        id: String,
    },

    /// Print the URL a read of this file is redirected to
    Url {
        /// File id
        id: String,
    },

    /// Delete a file everywhere
    Delete {
        /// File id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let base = cli.coordinator.trim_end_matches('/');
    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .build()?;

    match cli.command {
        Commands::Upload { file } => {
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .context("path has no file name")?;
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let size = data.len() as u64;

            let form = Form::new().part("file", Part::bytes(data).file_name(filename.clone()));
            let resp = client
                .post(format!("{}/upload", base))
                .multipart(form)
                .send()
                .await?;
            if resp.status() != StatusCode::CREATED {
                let status = resp.status();
                let body = resp.text().await?;
                bail!("upload failed: {} {}", status, body);
            }
            let id = resp
                .headers()
                .get(FILE_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("?");
            println!("Uploaded {} ({}) as {}", filename, format_bytes(size), id);
        }

        Commands::List => {
            let files: BTreeMap<String, FileRecord> = client
                .get(format!("{}/list", base))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{} files", files.len());
            for record in files.values() {
                println!(
                    "  {}  {}  {}  replicas: [{}]",
                    record.id,
                    record.filename,
                    format_bytes(record.size),
                    record.replicas.join(", ")
                );
            }
        }

        Commands::Nearest { id } => {
            let resp = client
                .get(format!("{}/nearest/{}", base, encode_key(&id)))
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await?;
                bail!("nearest failed: {} {}", status, body);
            }
            let node: StorageNode = resp.json().await?;
            println!(
                "Nearest replica: {} at {} ({}, {})",
                node.id, node.endpoint, node.lat, node.lon
            );
        }

        Commands::Url { id } => {
            let resp = client
                .get(format!("{}/file/{}", base, encode_key(&id)))
                .send()
                .await?;
            if !resp.status().is_redirection() {
                let status = resp.status();
                let body = resp.text().await?;
                bail!("read failed: {} {}", status, body);
            }
            let location = resp
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .context("redirect without location")?;
            println!("{}", location);
        }

        Commands::Delete { id } => {
            let text = client
                .delete(format!("{}/delete/{}", base, encode_key(&id)))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            println!("{}: {}", id, text);
        }
    }

    Ok(())
}
