use anyhow::Result;
use async_trait::async_trait;

use crate::types::{AnchorBranch, Fingerprint, NodeEndpoint, Proof, ProofHandle};

/// RPC surface of the anchoring network.
///
/// The network itself is an opaque external service; this trait covers
/// the four calls the pipeline needs: node discovery, hash submission,
/// batched proof retrieval, and ledger-entry resolution for verification.
/// Implementations must be safe for concurrent use across simultaneously
/// running pipelines (they are shared behind an `Arc`).
#[async_trait]
pub trait AnchorNetwork: Send + Sync {
    /// Human-readable client name for logging.
    fn name(&self) -> &'static str;

    /// Best-effort discovery of up to `count` currently healthy nodes.
    /// May return fewer when discovery is degraded; an empty result means
    /// submission must be treated as failed for this cycle.
    async fn discover_nodes(&self, count: usize) -> Result<Vec<NodeEndpoint>>;

    /// Fan each fingerprint out to each node. Returns one handle per
    /// (fingerprint, node) pair that accepted; a node's rejection or
    /// timeout excludes it from the result without failing the call.
    async fn submit_hashes(
        &self,
        fingerprints: &[Fingerprint],
        nodes: &[NodeEndpoint],
    ) -> Result<Vec<ProofHandle>>;

    /// One batched status query. Returns exactly one proof per handle
    /// that resolved; unresolved handles are omitted, not retried.
    /// Errs only when the query could not be issued at all.
    async fn get_proofs(&self, handles: &[ProofHandle]) -> Result<Vec<Proof>>;

    /// Resolve the public ledger value an anchor branch points at, for
    /// independent proof verification.
    async fn resolve_anchor(&self, branch: &AnchorBranch) -> Result<String>;
}
