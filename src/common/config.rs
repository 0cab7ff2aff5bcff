//! Configuration for the coordinator

use crate::common::{Error, GeoPoint, Result, StorageNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "GEOREPLICA_CONFIG";

/// Config file used when `GEOREPLICA_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "georeplica.toml";

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address for HTTP API
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// JSON document listing the storage nodes
    #[serde(default = "default_nodes_path")]
    pub nodes_path: PathBuf,

    /// JSON document holding the file ledger
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Point used by `/nearest/{id}`
    #[serde(default = "default_reference_point")]
    pub reference_point: GeoPoint,

    /// Timeout for every outbound request to a storage node
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Largest accepted upload body; unlimited when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,

    /// Directory served for paths no API route matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}
fn default_nodes_path() -> PathBuf {
    PathBuf::from("./files.json")
}
fn default_metadata_path() -> PathBuf {
    PathBuf::from("files.json.tmp")
}
// Singapore
fn default_reference_point() -> GeoPoint {
    GeoPoint::new(1.3521, 103.8198)
}
fn default_request_timeout() -> u64 {
    20
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            nodes_path: default_nodes_path(),
            metadata_path: default_metadata_path(),
            reference_point: default_reference_point(),
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: None,
            static_dir: None,
        }
    }
}

impl CoordinatorConfig {
    /// Load from the TOML file named by `GEOREPLICA_CONFIG` (optional) layered
    /// with `GEOREPLICA_*` environment variables.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(path)
    }

    /// Same as [`CoordinatorConfig::load`] with an explicit file path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let settings = ::config::Config::builder()
            .add_source(::config::File::new(&path, ::config::FileFormat::Toml).required(false))
            .add_source(
                ::config::Environment::with_prefix("GEOREPLICA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: CoordinatorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.max_upload_bytes == Some(0) {
            return Err(Error::InvalidConfig(
                "max_upload_bytes must be positive".into(),
            ));
        }
        self.reference_point.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Read the node document: an ordered JSON list of `{id, endpoint, lat, lon}`.
///
/// Any failure here is fatal for startup, the coordinator cannot run without a
/// known node set.
pub fn load_nodes(path: impl AsRef<Path>) -> Result<Vec<StorageNode>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_nodes(&raw)
        .map_err(|e| Error::InvalidConfig(format!("failed to parse {}: {}", path.display(), e)))
}

/// Parse and validate a node document held in memory.
pub fn parse_nodes(raw: &str) -> Result<Vec<StorageNode>> {
    let nodes: Vec<StorageNode> = serde_json::from_str(raw)?;

    let mut seen = HashSet::new();
    for node in &nodes {
        if node.id.is_empty() {
            return Err(Error::InvalidConfig("node id cannot be empty".into()));
        }
        if node.endpoint.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "node {} has an empty endpoint",
                node.id
            )));
        }
        node.location().validate()?;
        if !seen.insert(node.id.as_str()) {
            return Err(Error::InvalidConfig(format!("duplicate node id: {}", node.id)));
        }
    }

    Ok(nodes)
}
