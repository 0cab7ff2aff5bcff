//! Replica selection for reads
//!
//! A file's replica set is matched against the nodes configured for this
//! process, then the closest surviving node to the reference point wins.

use crate::common::{nearest, Error, GeoPoint, Result, StorageNode};
use crate::coordinator::metadata::FileRecord;

/// Configured nodes that hold a copy of `record`, in configuration order.
///
/// Replica ids naming a node that is no longer configured are skipped.
pub fn replica_candidates<'a>(
    record: &'a FileRecord,
    nodes: &'a [StorageNode],
) -> impl Iterator<Item = &'a StorageNode> + 'a {
    nodes.iter().filter(move |node| record.has_replica(&node.id))
}

/// Pick the replica of `record` closest to `point`.
pub fn select_nearest(
    record: &FileRecord,
    nodes: &[StorageNode],
    point: GeoPoint,
) -> Result<StorageNode> {
    if !record.is_replicated() {
        return Err(Error::Unavailable(format!(
            "file {} not replicated yet",
            record.id
        )));
    }

    nearest(point, replica_candidates(record, nodes))
        .cloned()
        .ok_or_else(|| {
            Error::Unavailable(format!(
                "no configured node holds a replica of {}",
                record.id
            ))
        })
}

/// Node used for redirect-style reads: always the first configured node.
pub fn read_node(nodes: &[StorageNode]) -> Result<&StorageNode> {
    nodes
        .first()
        .ok_or_else(|| Error::Unavailable("no storage nodes configured".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_node(id: &str, lat: f64, lon: f64) -> StorageNode {
        StorageNode::new(id, format!("http://{}.local", id), lat, lon)
    }

    fn mock_record(replicas: &[&str]) -> FileRecord {
        FileRecord::new(
            "file-1".into(),
            "a.bin".into(),
            4,
            replicas.iter().map(|r| r.to_string()).collect(),
        )
    }

    fn cluster() -> Vec<StorageNode> {
        vec![
            mock_node("n0", 0.0, 0.0),
            mock_node("n1", 10.0, 10.0),
            mock_node("n2", -10.0, -10.0),
        ]
    }

    #[test]
    fn test_select_nearest() {
        let nodes = cluster();
        let record = mock_record(&["n0", "n1", "n2"]);

        let chosen = select_nearest(&record, &nodes, GeoPoint::new(1.0, 1.0)).unwrap();
        assert_eq!(chosen.id, "n0");

        // from Singapore the (10, 10) node is closest
        let chosen = select_nearest(&record, &nodes, GeoPoint::new(1.3521, 103.8198)).unwrap();
        assert_eq!(chosen.id, "n1");
    }

    #[test]
    fn test_only_replica_holders_are_candidates() {
        let nodes = cluster();
        let record = mock_record(&["n2"]);

        let chosen = select_nearest(&record, &nodes, GeoPoint::new(1.0, 1.0)).unwrap();
        assert_eq!(chosen.id, "n2");
    }

    #[test]
    fn test_empty_replicas_unavailable() {
        let record = mock_record(&[]);
        let result = select_nearest(&record, &cluster(), GeoPoint::new(0.0, 0.0));
        assert!(matches!(result, Err(Error::Unavailable(_))));
    }

    #[test]
    fn test_unknown_replicas_unavailable() {
        let record = mock_record(&["retired-1", "retired-2"]);
        let result = select_nearest(&record, &cluster(), GeoPoint::new(0.0, 0.0));
        assert!(matches!(result, Err(Error::Unavailable(_))));
    }

    #[test]
    fn test_candidates_follow_config_order() {
        let nodes = cluster();
        let record = mock_record(&["n2", "gone", "n0"]);
        let ids: Vec<_> = replica_candidates(&record, &nodes)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["n0", "n2"]);
    }

    #[test]
    fn test_read_node() {
        let nodes = cluster();
        assert_eq!(read_node(&nodes).unwrap().id, "n0");
        assert!(matches!(read_node(&[]), Err(Error::Unavailable(_))));
    }
}
