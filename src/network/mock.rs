use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::pipeline::tasks::now_secs;
use crate::traits::AnchorNetwork;
use crate::types::{
    AnchorBranch, AnchorKind, Fingerprint, NodeEndpoint, Proof, ProofHandle, ProofStep,
};
use crate::verify::evaluate_chain;

/// Mock anchoring network for testing.
///
/// Issues deterministic handles (`h1`, `h2`, ...) in submission order and
/// matures proofs by poll count: the first status query after submission
/// returns a calendar-anchored (partial) proof, and queries from
/// `full_after_polls` onward also carry the public-ledger (full) branch.
/// Per-node knobs simulate rejection, slow nodes, and tampered ledgers.
#[derive(Clone)]
pub struct MockAnchorNetwork {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    nodes: Vec<NodeEndpoint>,
    rejected_nodes: HashSet<String>,
    /// node uri -> poll count before its handles start resolving.
    silent_until: HashMap<String, u64>,
    /// node uris whose ledger entries read back tampered.
    corrupted_ledgers: HashSet<String>,
    /// anchor_id -> value readable through `resolve_anchor`.
    ledger: HashMap<String, String>,
    full_after_polls: u64,
    polls: u64,
    next_handle: u64,
    fail_polls: bool,
}

impl MockAnchorNetwork {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                nodes: vec![
                    NodeEndpoint {
                        uri: "mock://node-1".to_string(),
                    },
                    NodeEndpoint {
                        uri: "mock://node-2".to_string(),
                    },
                ],
                rejected_nodes: HashSet::new(),
                silent_until: HashMap::new(),
                corrupted_ledgers: HashSet::new(),
                ledger: HashMap::new(),
                full_after_polls: 2,
                polls: 0,
                next_handle: 0,
                fail_polls: false,
            })),
        }
    }

    pub fn with_nodes(uris: &[&str]) -> Self {
        let mock = Self::new();
        mock.state.lock().unwrap().nodes = uris
            .iter()
            .map(|u| NodeEndpoint {
                uri: (*u).to_string(),
            })
            .collect();
        mock
    }

    /// Remove all nodes, simulating a fully degraded discovery service.
    pub fn clear_nodes(&self) {
        self.state.lock().unwrap().nodes.clear();
    }

    /// Make a node refuse submissions.
    pub fn reject_node(&self, uri: &str) {
        self.state.lock().unwrap().rejected_nodes.insert(uri.to_string());
    }

    /// Keep a node's handles unresolved until the given poll count.
    pub fn silence_node_until(&self, uri: &str, poll: u64) {
        self.state.lock().unwrap().silent_until.insert(uri.to_string(), poll);
    }

    /// Number of status queries before proofs gain the full (btc) branch.
    pub fn set_full_after_polls(&self, polls: u64) {
        self.state.lock().unwrap().full_after_polls = polls;
    }

    /// Tamper the ledger entries behind a node's anchors, so chain
    /// recomputation succeeds but ledger comparison fails.
    pub fn corrupt_ledger_for(&self, uri: &str) {
        self.state.lock().unwrap().corrupted_ledgers.insert(uri.to_string());
    }

    /// Make every status query fail at the transport level.
    pub fn fail_polls(&self, fail: bool) {
        self.state.lock().unwrap().fail_polls = fail;
    }

    pub fn poll_count(&self) -> u64 {
        self.state.lock().unwrap().polls
    }

    /// Per-handle sibling so distinct handles get distinct chains.
    fn salt_for(handle_id: &str) -> String {
        hex::encode(&Sha256::digest(handle_id.as_bytes())[..16])
    }

    fn steps_for(handle_id: &str) -> Vec<ProofStep> {
        vec![ProofStep::Right(Self::salt_for(handle_id)), ProofStep::Sha256]
    }
}

impl Default for MockAnchorNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnchorNetwork for MockAnchorNetwork {
    fn name(&self) -> &'static str {
        "mock-anchor-network"
    }

    async fn discover_nodes(&self, count: usize) -> Result<Vec<NodeEndpoint>> {
        let state = self.state.lock().unwrap();
        Ok(state.nodes.iter().take(count).cloned().collect())
    }

    async fn submit_hashes(
        &self,
        fingerprints: &[Fingerprint],
        nodes: &[NodeEndpoint],
    ) -> Result<Vec<ProofHandle>> {
        let mut state = self.state.lock().unwrap();
        let mut handles = Vec::new();

        for fingerprint in fingerprints {
            for node in nodes {
                if state.rejected_nodes.contains(&node.uri) {
                    continue;
                }
                state.next_handle += 1;
                handles.push(ProofHandle {
                    handle_id: format!("h{}", state.next_handle),
                    node_uri: node.uri.clone(),
                    hash: fingerprint.as_hex().to_string(),
                });
            }
        }

        Ok(handles)
    }

    async fn get_proofs(&self, handles: &[ProofHandle]) -> Result<Vec<Proof>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_polls {
            bail!("mock network: status query unavailable");
        }

        state.polls += 1;
        let polls = state.polls;
        let full = polls >= state.full_after_polls;
        let retrieved_at = now_secs();

        let mut proofs = Vec::new();
        for handle in handles {
            if let Some(until) = state.silent_until.get(&handle.node_uri) {
                if polls < *until {
                    continue;
                }
            }

            let steps = Self::steps_for(&handle.handle_id);
            let root = evaluate_chain(&handle.hash, &steps)
                .expect("mock chain evaluates over valid hex");

            let mut anchors = vec![AnchorBranch {
                kind: AnchorKind::Cal,
                anchor_id: format!("cal-{}", handle.handle_id),
                uris: vec![handle.node_uri.clone()],
                expected_value: root.clone(),
            }];
            if full {
                anchors.push(AnchorBranch {
                    kind: AnchorKind::Btc,
                    anchor_id: format!("btc-{}", handle.handle_id),
                    uris: vec![handle.node_uri.clone()],
                    expected_value: root.clone(),
                });
            }

            // Publish the ledger entries the anchors point at.
            let ledger_value = if state.corrupted_ledgers.contains(&handle.node_uri) {
                hex::encode(Sha256::digest(root.as_bytes()))
            } else {
                root.clone()
            };
            for anchor in &anchors {
                state.ledger.insert(anchor.anchor_id.clone(), ledger_value.clone());
            }

            proofs.push(Proof {
                handle_id: handle.handle_id.clone(),
                node_uri: handle.node_uri.clone(),
                hash: handle.hash.clone(),
                steps,
                anchors,
                retrieved_at,
            });
        }

        Ok(proofs)
    }

    async fn resolve_anchor(&self, branch: &AnchorBranch) -> Result<String> {
        let state = self.state.lock().unwrap();
        state
            .ledger
            .get(&branch.anchor_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown anchor {}", branch.anchor_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(byte: u8) -> Fingerprint {
        Fingerprint::from_hex(hex::encode([byte; 32]))
    }

    #[tokio::test]
    async fn test_submission_fans_out_per_node() {
        let mock = MockAnchorNetwork::new();
        let nodes = mock.discover_nodes(2).await.unwrap();
        let handles = mock.submit_hashes(&[fp(1)], &nodes).await.unwrap();
        assert_eq!(handles.len(), 2);
        assert_ne!(handles[0].handle_id, handles[1].handle_id);
        assert_eq!(handles[0].hash, handles[1].hash);
    }

    #[tokio::test]
    async fn test_rejected_node_is_excluded() {
        let mock = MockAnchorNetwork::new();
        mock.reject_node("mock://node-2");
        let nodes = mock.discover_nodes(2).await.unwrap();
        let handles = mock.submit_hashes(&[fp(1)], &nodes).await.unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].node_uri, "mock://node-1");
    }

    #[tokio::test]
    async fn test_proofs_mature_partial_then_full() {
        use crate::types::ProofState;

        let mock = MockAnchorNetwork::new();
        let nodes = mock.discover_nodes(1).await.unwrap();
        let handles = mock.submit_hashes(&[fp(1)], &nodes).await.unwrap();

        let first = mock.get_proofs(&handles).await.unwrap();
        assert_eq!(first[0].state(), ProofState::Partial);

        let second = mock.get_proofs(&handles).await.unwrap();
        assert_eq!(second[0].state(), ProofState::Full);
    }

    #[tokio::test]
    async fn test_ledger_resolves_published_anchors() {
        let mock = MockAnchorNetwork::new();
        let nodes = mock.discover_nodes(1).await.unwrap();
        let handles = mock.submit_hashes(&[fp(1)], &nodes).await.unwrap();
        let proofs = mock.get_proofs(&handles).await.unwrap();

        let branch = &proofs[0].anchors[0];
        let value = mock.resolve_anchor(branch).await.unwrap();
        assert_eq!(value, branch.expected_value);
    }
}
