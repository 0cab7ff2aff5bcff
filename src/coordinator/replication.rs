//! Fan-out of file copies and deletes to the storage nodes
//!
//! Every node is contacted independently and concurrently. A node's failure
//! only removes that node from the acknowledgment set; nothing is retried and
//! nodes that already accepted a copy are never rolled back.

use crate::common::{Error, Result, StorageNode};
use bytes::Bytes;
use futures_util::future::join_all;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of pushing one file to one node
#[derive(Debug)]
pub struct NodeOutcome {
    pub node_id: String,
    pub result: Result<()>,
}

impl NodeOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct ReplicationEngine {
    client: Client,
}

impl ReplicationEngine {
    /// Build an engine whose requests to nodes are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        // node endpoints are cluster-internal, never route them through a proxy
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Push a copy to every node and return the ids that answered 201 Created,
    /// in node configuration order.
    pub async fn replicate(
        &self,
        id: &str,
        filename: &str,
        data: Bytes,
        nodes: &[StorageNode],
    ) -> Vec<String> {
        self.replicate_detailed(id, filename, data, nodes)
            .await
            .into_iter()
            .filter(NodeOutcome::is_success)
            .map(|outcome| outcome.node_id)
            .collect()
    }

    /// Like [`ReplicationEngine::replicate`] but keeps every node's outcome.
    pub async fn replicate_detailed(
        &self,
        id: &str,
        filename: &str,
        data: Bytes,
        nodes: &[StorageNode],
    ) -> Vec<NodeOutcome> {
        let pushes = nodes.iter().map(|node| {
            let data = data.clone();
            async move {
                tracing::info!("Replicating {} to {}", id, node.id);
                let result = self.push(node, id, filename, data).await;
                match &result {
                    Ok(()) => tracing::debug!("Replicated {} to {}", id, node.id),
                    Err(e) => tracing::warn!("Replication of {} to {} failed: {}", id, node.id, e),
                }
                NodeOutcome {
                    node_id: node.id.clone(),
                    result,
                }
            }
        });

        join_all(pushes).await
    }

    async fn push(&self, node: &StorageNode, id: &str, filename: &str, data: Bytes) -> Result<()> {
        let len = data.len() as u64;
        let file = Part::stream_with_length(data, len).file_name(filename.to_string());
        let form = Form::new()
            .text("id", id.to_string())
            .text("filename", filename.to_string())
            .part("file", file);

        let response = self
            .client
            .post(node.replicate_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Replicate status from {}: {}", node.id, status);
        if status == StatusCode::CREATED {
            Ok(())
        } else {
            Err(Error::ReplicationRejected {
                node: node.id.clone(),
                status: status.as_u16(),
            })
        }
    }

    /// Ask every node to drop its copy. Outcomes are logged and discarded.
    pub async fn delete_everywhere(&self, id: &str, nodes: &[StorageNode]) {
        let deletes = nodes.iter().map(|node| async move {
            match self.client.delete(node.delete_url(id)).send().await {
                Ok(response) => {
                    tracing::debug!("Delete {} on {}: {}", id, node.id, response.status())
                }
                Err(e) => tracing::warn!("Delete {} on {} failed: {}", id, node.id, e),
            }
        });

        join_all(deletes).await;
    }
}
