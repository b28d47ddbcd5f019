use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::traits::AnchorNetwork;
use crate::types::{AnchorBranch, Fingerprint, NodeEndpoint, Proof, ProofHandle};

/// Noop anchoring network for the default initialization path.
pub struct NoopAnchorNetwork;

#[async_trait]
impl AnchorNetwork for NoopAnchorNetwork {
    fn name(&self) -> &'static str {
        "noop-anchor-network"
    }

    async fn discover_nodes(&self, _count: usize) -> Result<Vec<NodeEndpoint>> {
        tracing::info!("NoopAnchorNetwork: no nodes to discover");
        Ok(Vec::new())
    }

    async fn submit_hashes(
        &self,
        _fingerprints: &[Fingerprint],
        _nodes: &[NodeEndpoint],
    ) -> Result<Vec<ProofHandle>> {
        Ok(Vec::new())
    }

    async fn get_proofs(&self, _handles: &[ProofHandle]) -> Result<Vec<Proof>> {
        Ok(Vec::new())
    }

    async fn resolve_anchor(&self, branch: &AnchorBranch) -> Result<String> {
        bail!("noop network cannot resolve anchor {}", branch.anchor_id)
    }
}
