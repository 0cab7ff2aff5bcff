//! # georeplica
//!
//! A replication coordinator for a small blob storage cluster:
//! - Uploads are accepted once and fanned out to every configured storage node
//! - A JSON metadata ledger records which nodes acknowledged each file
//! - "Nearest replica" lookups use great-circle distance to a reference point
//! - Deletes are broadcast best-effort to every node
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Coordinator                │
//! │  metadata ledger (files.json.tmp)       │
//! │  replication engine (HTTP fan-out)      │
//! │  geo placement (haversine)              │
//! └───────────┬─────────────────────────────┘
//!             │ HTTP (multipart /replicate)
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐   ┌─────▼──────┐   ┌──▼───────────┐
//! │ Node sg-1  │   │ Node eu-1  │   │ Node us-1    │
//! │ (1.3, 103) │   │ (50, 8)    │   │ (37, -122)   │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start the coordinator
//! ```bash
//! georeplica-coord serve \
//!   --bind 0.0.0.0:8000 \
//!   --nodes ./files.json \
//!   --metadata ./files.json.tmp
//! ```
//!
//! ### Use the CLI
//! ```bash
//! georeplica upload ./photo.jpg
//! georeplica list
//! georeplica nearest 1700000000000000000-0
//! georeplica delete 1700000000000000000-0
//! ```

pub mod common;
pub mod coordinator;

// Re-export commonly used types
pub use common::{CoordinatorConfig, Error, GeoPoint, Result};
pub use coordinator::{Coordinator, FileRecord, StorageNode};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
