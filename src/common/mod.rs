//! Common utilities and types shared across georeplica

pub mod config;
pub mod error;
pub mod geo;
pub mod node;
pub mod tracing_middleware;
pub mod utils;

pub use config::{load_nodes, parse_nodes, CoordinatorConfig};
pub use error::{Error, Result};
pub use geo::{haversine_km, nearest, GeoPoint, EARTH_RADIUS_KM};
pub use node::StorageNode;
pub use utils::{encode_key, format_bytes, generate_file_id, timestamp_now_nanos};
