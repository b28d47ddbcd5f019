use anyhow::Result;
use async_trait::async_trait;

use super::http::HttpAnchorClient;
use super::mock::MockAnchorNetwork;
use super::noop::NoopAnchorNetwork;
use crate::traits::AnchorNetwork;
use crate::types::{AnchorBranch, Fingerprint, NodeEndpoint, Proof, ProofHandle};

/// Enum representing all possible anchoring-network client implementations.
pub enum AnchorNetworkVariant {
    Noop(NoopAnchorNetwork),
    Mock(MockAnchorNetwork),
    Http(HttpAnchorClient),
}

#[async_trait]
impl AnchorNetwork for AnchorNetworkVariant {
    fn name(&self) -> &'static str {
        match self {
            AnchorNetworkVariant::Noop(inner) => inner.name(),
            AnchorNetworkVariant::Mock(inner) => inner.name(),
            AnchorNetworkVariant::Http(inner) => inner.name(),
        }
    }

    async fn discover_nodes(&self, count: usize) -> Result<Vec<NodeEndpoint>> {
        match self {
            AnchorNetworkVariant::Noop(inner) => inner.discover_nodes(count).await,
            AnchorNetworkVariant::Mock(inner) => inner.discover_nodes(count).await,
            AnchorNetworkVariant::Http(inner) => inner.discover_nodes(count).await,
        }
    }

    async fn submit_hashes(
        &self,
        fingerprints: &[Fingerprint],
        nodes: &[NodeEndpoint],
    ) -> Result<Vec<ProofHandle>> {
        match self {
            AnchorNetworkVariant::Noop(inner) => inner.submit_hashes(fingerprints, nodes).await,
            AnchorNetworkVariant::Mock(inner) => inner.submit_hashes(fingerprints, nodes).await,
            AnchorNetworkVariant::Http(inner) => inner.submit_hashes(fingerprints, nodes).await,
        }
    }

    async fn get_proofs(&self, handles: &[ProofHandle]) -> Result<Vec<Proof>> {
        match self {
            AnchorNetworkVariant::Noop(inner) => inner.get_proofs(handles).await,
            AnchorNetworkVariant::Mock(inner) => inner.get_proofs(handles).await,
            AnchorNetworkVariant::Http(inner) => inner.get_proofs(handles).await,
        }
    }

    async fn resolve_anchor(&self, branch: &AnchorBranch) -> Result<String> {
        match self {
            AnchorNetworkVariant::Noop(inner) => inner.resolve_anchor(branch).await,
            AnchorNetworkVariant::Mock(inner) => inner.resolve_anchor(branch).await,
            AnchorNetworkVariant::Http(inner) => inner.resolve_anchor(branch).await,
        }
    }
}
