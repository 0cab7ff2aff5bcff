//! Great-circle distance and nearest-node selection

use crate::common::{Error, Result, StorageNode};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A coordinate in signed degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(Error::InvalidConfig(format!(
                "coordinate out of range: ({}, {})",
                self.lat, self.lon
            )));
        }
        Ok(())
    }
}

/// Haversine distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + (d_lon / 2.0).sin().powi(2) * a.lat.to_radians().cos() * b.lat.to_radians().cos();
    // clamp guards asin against rounding just above 1.0 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Pick the candidate closest to `point`.
///
/// Ties go to the first candidate in iteration order. Returns `None` only when
/// there are no candidates.
pub fn nearest<'a, I>(point: GeoPoint, candidates: I) -> Option<&'a StorageNode>
where
    I: IntoIterator<Item = &'a StorageNode>,
{
    let mut best: Option<(&StorageNode, f64)> = None;
    for node in candidates {
        let d = haversine_km(point, node.location());
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((node, d)),
        }
    }
    best.map(|(node, _)| node)
}
