//! Coordinator implementation
//!
//! The coordinator is responsible for:
//! - Metadata management (file id → replica set)
//! - Fan-out replication and deletion across storage nodes
//! - Geo-nearest replica selection
//! - The public HTTP API

pub mod http;
pub mod metadata;
pub mod placement;
pub mod replication;
pub mod server;

pub use metadata::{FileRecord, MetadataStore};
pub use replication::{NodeOutcome, ReplicationEngine};
pub use server::Coordinator;

pub use crate::common::StorageNode;
