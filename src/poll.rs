use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::network::AnchorNetworkVariant;
use crate::traits::AnchorNetwork;
use crate::types::{PollOutcome, ProofHandle};

/// Waits out a maturation checkpoint, then asks the network once whether
/// proofs have matured for a set of handles.
///
/// There is no busy-polling here: one suspension, one batched status
/// query. Calling again later with the same handles is safe and is how
/// full-proof maturation is achieved.
pub struct MaturationPoller {
    network: Arc<AnchorNetworkVariant>,
}

impl MaturationPoller {
    pub fn new(network: Arc<AnchorNetworkVariant>) -> Self {
        Self { network }
    }

    /// Suspend for at least `min_delay`, then issue a single batched
    /// status query over all handles.
    ///
    /// Handles that error or have nothing anchored yet land in
    /// `unresolved`; only a query that could not be issued at all fails
    /// the call.
    pub async fn await_proofs(
        &self,
        handles: &[ProofHandle],
        min_delay: Duration,
    ) -> PipelineResult<PollOutcome> {
        if handles.is_empty() {
            debug!("No handles to poll");
            return Ok(PollOutcome {
                proofs: Vec::new(),
                unresolved: Vec::new(),
            });
        }

        if !min_delay.is_zero() {
            debug!(
                "Waiting {}s for proofs to mature across {} handles",
                min_delay.as_secs(),
                handles.len()
            );
            tokio::time::sleep(min_delay).await;
        }

        let proofs = self
            .network
            .get_proofs(handles)
            .await
            .map_err(|e| {
                warn!("Batched proof query failed: {}", e);
                PipelineError::PollFailed(handles.len())
            })?;

        let resolved: HashSet<&str> = proofs.iter().map(|p| p.handle_id.as_str()).collect();
        let unresolved: Vec<ProofHandle> = handles
            .iter()
            .filter(|h| !resolved.contains(h.handle_id.as_str()))
            .cloned()
            .collect();

        for handle in &unresolved {
            warn!(
                "Handle {} on {} not resolved yet",
                handle.handle_id, handle.node_uri
            );
        }

        Ok(PollOutcome { proofs, unresolved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MockAnchorNetwork;
    use crate::types::Fingerprint;

    fn fp(byte: u8) -> Fingerprint {
        Fingerprint::from_hex(hex::encode([byte; 32]))
    }

    #[tokio::test]
    async fn test_partial_resolution_is_not_an_error() {
        let mock = MockAnchorNetwork::new();
        mock.silence_node_until("mock://node-2", 2);

        let nodes = mock.discover_nodes(2).await.unwrap();
        let handles = mock.submit_hashes(&[fp(1)], &nodes).await.unwrap();
        assert_eq!(handles.len(), 2);

        let poller = MaturationPoller::new(Arc::new(AnchorNetworkVariant::Mock(mock)));
        let outcome = poller
            .await_proofs(&handles, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(outcome.proofs.len(), 1);
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.unresolved[0].node_uri, "mock://node-2");
    }

    #[tokio::test]
    async fn test_total_query_failure_surfaces() {
        let mock = MockAnchorNetwork::new();
        mock.fail_polls(true);

        let nodes = mock.discover_nodes(1).await.unwrap();
        let handles = mock.submit_hashes(&[fp(1)], &nodes).await.unwrap();

        let poller = MaturationPoller::new(Arc::new(AnchorNetworkVariant::Mock(mock)));
        let result = poller.await_proofs(&handles, Duration::ZERO).await;
        assert!(matches!(result, Err(PipelineError::PollFailed(1))));
    }

    #[tokio::test]
    async fn test_empty_handle_set_short_circuits() {
        let mock = MockAnchorNetwork::new();
        let poller = MaturationPoller::new(Arc::new(AnchorNetworkVariant::Mock(mock.clone())));
        let outcome = poller.await_proofs(&[], Duration::ZERO).await.unwrap();
        assert!(outcome.proofs.is_empty());
        // No query was issued at all.
        assert_eq!(mock.poll_count(), 0);
    }
}
