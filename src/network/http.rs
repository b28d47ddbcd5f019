use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::pipeline::tasks::now_secs;
use crate::traits::AnchorNetwork;
use crate::types::{AnchorBranch, Fingerprint, NodeEndpoint, Proof, ProofHandle, ProofStep};

/// HTTP client for a Chainpoint-style anchoring network.
///
/// # Protocol
/// - `GET {discovery}/nodes/random` - list of currently healthy nodes
/// - `POST {node}/hashes` - submit fingerprints, returns handle ids
/// - `GET {node}/proofs` with a `hashids` header - batched proof status
/// - `GET {uri}/calendar/{anchor_id}/hash` - public ledger entry value
pub struct HttpAnchorClient {
    client: Client,
    discovery_uri: String,
}

/// Node entry from the discovery service.
#[derive(Debug, Deserialize)]
struct NodeInfo {
    public_uri: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    hashes: Vec<SubmittedHash>,
}

#[derive(Debug, Deserialize)]
struct SubmittedHash {
    hash_id_node: String,
    hash: String,
}

/// Per-handle status entry. `proof` is null while the node has nothing
/// anchored for the handle yet.
#[derive(Debug, Deserialize)]
struct ProofStatus {
    hash_id_node: String,
    proof: Option<ProofDoc>,
}

#[derive(Debug, Deserialize)]
struct ProofDoc {
    hash: String,
    steps: Vec<ProofStep>,
    anchors: Vec<AnchorBranch>,
}

impl HttpAnchorClient {
    pub fn new(discovery_uri: String) -> Self {
        Self {
            client: Client::new(),
            discovery_uri,
        }
    }
}

#[async_trait]
impl AnchorNetwork for HttpAnchorClient {
    fn name(&self) -> &'static str {
        "http-anchor-network"
    }

    async fn discover_nodes(&self, count: usize) -> Result<Vec<NodeEndpoint>> {
        let nodes: Vec<NodeInfo> = self
            .client
            .get(format!("{}/nodes/random", self.discovery_uri))
            .send()
            .await
            .context("node discovery request failed")?
            .error_for_status()
            .context("node discovery rejected")?
            .json()
            .await
            .context("node discovery returned malformed JSON")?;

        debug!("Discovery returned {} nodes, taking up to {}", nodes.len(), count);

        Ok(nodes
            .into_iter()
            .take(count)
            .map(|n| NodeEndpoint { uri: n.public_uri })
            .collect())
    }

    async fn submit_hashes(
        &self,
        fingerprints: &[Fingerprint],
        nodes: &[NodeEndpoint],
    ) -> Result<Vec<ProofHandle>> {
        let hashes: Vec<&str> = fingerprints.iter().map(|f| f.as_hex()).collect();
        let mut handles = Vec::new();

        for node in nodes {
            let response = self
                .client
                .post(format!("{}/hashes", node.uri))
                .json(&serde_json::json!({ "hashes": hashes }))
                .send()
                .await;

            let accepted: SubmitResponse = match response {
                Ok(resp) if resp.status().is_success() => match resp.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("Node {} returned malformed submit response: {}", node.uri, e);
                        continue;
                    }
                },
                Ok(resp) => {
                    warn!("Node {} rejected submission: {}", node.uri, resp.status());
                    continue;
                }
                Err(e) => {
                    warn!("Submission to node {} failed: {}", node.uri, e);
                    continue;
                }
            };

            for submitted in accepted.hashes {
                handles.push(ProofHandle {
                    handle_id: submitted.hash_id_node,
                    node_uri: node.uri.clone(),
                    hash: submitted.hash,
                });
            }
        }

        Ok(handles)
    }

    async fn get_proofs(&self, handles: &[ProofHandle]) -> Result<Vec<Proof>> {
        // One request per node, batching all of that node's handles into
        // a single `hashids` header.
        let mut by_node: HashMap<&str, Vec<&ProofHandle>> = HashMap::new();
        for handle in handles {
            by_node.entry(&handle.node_uri).or_default().push(handle);
        }

        let retrieved_at = now_secs();
        let mut proofs = Vec::new();

        for (node_uri, node_handles) in by_node {
            let hashids = node_handles
                .iter()
                .map(|h| h.handle_id.as_str())
                .collect::<Vec<_>>()
                .join(",");

            let response = self
                .client
                .get(format!("{}/proofs", node_uri))
                .header("hashids", hashids)
                .send()
                .await;

            let statuses: Vec<ProofStatus> = match response {
                Ok(resp) if resp.status().is_success() => match resp.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("Node {} returned malformed proof response: {}", node_uri, e);
                        continue;
                    }
                },
                Ok(resp) => {
                    warn!("Node {} rejected proof query: {}", node_uri, resp.status());
                    continue;
                }
                Err(e) => {
                    warn!("Proof query to node {} failed: {}", node_uri, e);
                    continue;
                }
            };

            for status in statuses {
                if let Some(doc) = status.proof {
                    proofs.push(Proof {
                        handle_id: status.hash_id_node,
                        node_uri: node_uri.to_string(),
                        hash: doc.hash,
                        steps: doc.steps,
                        anchors: doc.anchors,
                        retrieved_at,
                    });
                }
            }
        }

        Ok(proofs)
    }

    async fn resolve_anchor(&self, branch: &AnchorBranch) -> Result<String> {
        let mut last_error = anyhow!("anchor branch {} lists no ledger URIs", branch.anchor_id);

        for uri in &branch.uris {
            let response = self
                .client
                .get(format!("{}/calendar/{}/hash", uri, branch.anchor_id))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(value) => return Ok(value.trim().to_string()),
                    Err(e) => last_error = anyhow!("ledger read from {} failed: {}", uri, e),
                },
                Ok(resp) => {
                    last_error = anyhow!("ledger {} rejected lookup: {}", uri, resp.status())
                }
                Err(e) => last_error = anyhow!("ledger {} unreachable: {}", uri, e),
            }
        }

        Err(last_error)
    }
}
