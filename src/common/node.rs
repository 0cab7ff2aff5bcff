//! Storage node descriptors

use crate::common::utils::encode_key;
use crate::common::GeoPoint;
use serde::{Deserialize, Serialize};

/// A replica target, loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageNode {
    pub id: String,
    /// Base address of the node's HTTP API
    #[serde(alias = "url")]
    pub endpoint: String,
    pub lat: f64,
    pub lon: f64,
}

impl StorageNode {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            lat,
            lon,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    fn base(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    /// `POST` target for pushing a copy
    pub fn replicate_url(&self) -> String {
        format!("{}/replicate", self.base())
    }

    /// `GET` target for reading a file back
    pub fn file_url(&self, file_id: &str) -> String {
        format!("{}/file/{}", self.base(), encode_key(file_id))
    }

    /// `DELETE` target for dropping a copy
    pub fn delete_url(&self, file_id: &str) -> String {
        format!("{}/delete/{}", self.base(), encode_key(file_id))
    }
}
