//! Coordinator server

use crate::common::{
    format_bytes, generate_file_id, load_nodes, CoordinatorConfig, Error, GeoPoint, Result,
    StorageNode,
};
use crate::coordinator::http::create_router;
use crate::coordinator::metadata::{FileRecord, MetadataStore};
use crate::coordinator::placement::{read_node, select_nearest};
use crate::coordinator::replication::ReplicationEngine;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Owns the node list, the file ledger and the replication engine.
///
/// Built once at startup; HTTP handlers share it through an `Arc`.
pub struct Coordinator {
    config: CoordinatorConfig,
    nodes: Vec<StorageNode>,
    metadata: MetadataStore,
    replication: ReplicationEngine,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, nodes: Vec<StorageNode>) -> Result<Self> {
        config.validate()?;
        let metadata = MetadataStore::open(&config.metadata_path);
        let replication = ReplicationEngine::new(config.request_timeout())?;
        Ok(Self {
            config,
            nodes,
            metadata,
            replication,
        })
    }

    /// Build from config, reading the node document it points at.
    pub fn from_config(config: CoordinatorConfig) -> Result<Self> {
        let nodes = load_nodes(&config.nodes_path)?;
        tracing::info!("Loaded {} storage nodes", nodes.len());
        for node in &nodes {
            tracing::info!("  node {} at {} ({}, {})", node.id, node.endpoint, node.lat, node.lon);
        }
        Self::new(config, nodes)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[StorageNode] {
        &self.nodes
    }

    pub fn reference_point(&self) -> GeoPoint {
        self.config.reference_point
    }

    /// Store a new file: push it to every node, then record who acknowledged.
    ///
    /// Succeeds even when no node accepted the copy; the record then has an
    /// empty replica set.
    pub async fn ingest(&self, filename: &str, data: Bytes) -> FileRecord {
        let id = generate_file_id();
        let size = data.len() as u64;
        tracing::info!("Ingesting {} as {} ({})", filename, id, format_bytes(size));

        let replicas = self
            .replication
            .replicate(&id, filename, data, &self.nodes)
            .await;

        let record = FileRecord::new(id, filename.to_string(), size, replicas);
        self.metadata.put(record.clone());

        tracing::info!(
            "Ingest of {} done: {}/{} replicas",
            record.id,
            record.replicas.len(),
            self.nodes.len()
        );
        record
    }

    /// Closest node holding a copy of `id`, measured from `point`.
    pub fn locate_nearest(&self, id: &str, point: GeoPoint) -> Result<StorageNode> {
        if self.nodes.is_empty() {
            return Err(Error::Unavailable("no storage nodes configured".into()));
        }

        let record = self
            .metadata
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        select_nearest(&record, &self.nodes, point)
    }

    /// [`Coordinator::locate_nearest`] from the configured reference point.
    pub fn locate_nearest_default(&self, id: &str) -> Result<StorageNode> {
        self.locate_nearest(id, self.reference_point())
    }

    /// URL a reader is redirected to. Always the first configured node,
    /// regardless of where replicas live.
    pub fn resolve_for_read(&self, id: &str) -> Result<String> {
        Ok(read_node(&self.nodes)?.file_url(id))
    }

    /// Best-effort delete on every node, then drop the record unconditionally.
    /// Returns whether a record existed.
    pub async fn delete(&self, id: &str) -> bool {
        self.replication.delete_everywhere(id, &self.nodes).await;
        let existed = self.metadata.delete(id);
        tracing::info!("Deleted {} (known: {})", id, existed);
        existed
    }

    pub fn get(&self, id: &str) -> Option<FileRecord> {
        self.metadata.get(id)
    }

    pub fn list(&self) -> BTreeMap<String, FileRecord> {
        self.metadata.list()
    }

    pub fn file_count(&self) -> usize {
        self.metadata.len()
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting coordinator");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Metadata: {}", self.config.metadata_path.display());
        tracing::info!("  Nodes: {}", self.nodes.len());
        tracing::info!(
            "  Reference point: ({}, {})",
            self.config.reference_point.lat,
            self.config.reference_point.lon
        );

        let bind_addr = self.config.bind_addr;
        let router = create_router(Arc::new(self));

        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("✓ Coordinator ready on {}", listener.local_addr()?);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Coordinator stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn coordinator(dir: &TempDir, nodes: Vec<StorageNode>) -> Coordinator {
        let config = CoordinatorConfig {
            metadata_path: dir.path().join("files.json"),
            request_timeout_secs: 2,
            ..Default::default()
        };
        Coordinator::new(config, nodes).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_without_nodes_records_empty_replicas() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(&dir, vec![]);

        let record = coord.ingest("notes.txt", Bytes::from_static(b"abc")).await;
        let stored = coord.get(&record.id).unwrap();
        assert_eq!(stored.filename, "notes.txt");
        assert_eq!(stored.size, 3);
        assert!(stored.replicas.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_ids_are_unique() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(&dir, vec![]);

        let a = coord.ingest("a", Bytes::from_static(b"1")).await;
        let b = coord.ingest("a", Bytes::from_static(b"1")).await;
        assert_ne!(a.id, b.id);
        assert_eq!(coord.file_count(), 2);
    }

    #[tokio::test]
    async fn test_locate_nearest_errors() {
        let dir = TempDir::new().unwrap();

        let empty = coordinator(&dir, vec![]);
        assert!(matches!(
            empty.locate_nearest_default("missing"),
            Err(Error::Unavailable(_))
        ));

        let other = TempDir::new().unwrap();
        let coord = coordinator(
            &other,
            vec![StorageNode::new("n0", "http://127.0.0.1:9", 0.0, 0.0)],
        );
        assert!(matches!(
            coord.locate_nearest_default("missing"),
            Err(Error::NotFound(_))
        ));

        // port 9 refuses the push, so the file exists without replicas
        let record = coord.ingest("a.txt", Bytes::from_static(b"x")).await;
        assert!(matches!(
            coord.locate_nearest_default(&record.id),
            Err(Error::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_for_read() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(
            &dir,
            vec![
                StorageNode::new("first", "http://first:9001", 0.0, 0.0),
                StorageNode::new("second", "http://second:9001", 1.0, 1.0),
            ],
        );
        assert_eq!(
            coord.resolve_for_read("f1").unwrap(),
            "http://first:9001/file/f1"
        );

        let other = TempDir::new().unwrap();
        let empty = coordinator(&other, vec![]);
        assert!(matches!(
            empty.resolve_for_read("f1"),
            Err(Error::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(&dir, vec![]);

        assert!(!coord.delete("never-created").await);

        let record = coord.ingest("a.txt", Bytes::from_static(b"x")).await;
        assert!(coord.delete(&record.id).await);
        assert!(coord.get(&record.id).is_none());
    }
}
