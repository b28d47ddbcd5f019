//! Per-document pipeline logic. Each step's output is the next step's
//! required input, so a run is a straight sequence: fingerprint ->
//! submit -> poll@fast -> archive v1 -> (durable wait) -> poll@full ->
//! verify -> archive v2.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::archive::PROOF_SUFFIX;
use crate::crypto;
use crate::error::{PipelineError, PipelineResult};
use crate::poll::MaturationPoller;
use crate::traits::{AnchorNetwork, DocumentSource};
use crate::types::{
    AnchorTask, ArchiveLocation, BundleProof, Fingerprint, NodeEndpoint, PollOutcome, Proof,
    ProofBundle, ProofState, SubmissionOutcome, VerifiedProof,
};
use crate::verify::ProofVerifier;

use super::core::PipelineContext;
use super::tasks::now_secs;

/// What a full-checkpoint run decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullOutcome {
    /// The upgraded bundle was archived; the task is finished.
    Archived,
    /// No full anchor yet; the task should wait further.
    Deferred,
}

/// One stored proof bundle re-read from a document's attachments,
/// re-verified against the network.
#[derive(Debug, Clone)]
pub struct BundleReview {
    pub file_name: String,
    /// None when the attachment did not parse as a bundle.
    pub bundle: Option<ProofBundle>,
    pub verified: Vec<VerifiedProof>,
}

impl PipelineContext {
    /// Entry point for one document's anchoring run. Fire-and-forget
    /// from the caller's perspective: failures are logged against the
    /// document id, never propagated.
    pub async fn run_anchoring_pipeline(&self, document_id: &str) {
        if !self.try_claim(document_id).await {
            warn!(
                "Document {} already has a pipeline run in flight, skipping",
                document_id
            );
            return;
        }

        let result = self.fast_checkpoint(document_id).await;
        self.release(document_id).await;

        match result {
            Ok(location) => info!(
                "Anchoring pipeline archived {} for document {}",
                location.filename, document_id
            ),
            Err(e) => error!("Anchoring pipeline failed for {}: {}", document_id, e),
        }
    }

    /// Fingerprint, submit, wait out the fast checkpoint, archive the
    /// first bundle, and schedule the durable full checkpoint.
    pub async fn fast_checkpoint(&self, document_id: &str) -> PipelineResult<ArchiveLocation> {
        let document =
            self.source
                .get_document(document_id)
                .await
                .map_err(|e| PipelineError::DocumentFetch {
                    id: document_id.to_string(),
                    source: e,
                })?;

        let fingerprint = crypto::fingerprint(&document, &self.config.fingerprint_secret);
        info!("Fingerprinted document {}: {}", document_id, fingerprint);

        let nodes = match self
            .network
            .discover_nodes(self.config.submit_node_count)
            .await
        {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!("Node discovery failed: {}", e);
                Vec::new()
            }
        };
        if nodes.is_empty() {
            return Err(PipelineError::NoNodes);
        }

        let submission = self.submit(&fingerprint, &nodes).await?;
        info!(
            "Submission accepted by {}/{} nodes for {}",
            submission.handles.len(),
            nodes.len(),
            document_id
        );
        if submission.rejected > 0 {
            warn!(
                "{} node(s) rejected the submission for {}; continuing with the rest",
                submission.rejected, document_id
            );
        }

        let poller = MaturationPoller::new(Arc::clone(&self.network));
        let outcome = match poller
            .await_proofs(
                &submission.handles,
                Duration::from_secs(self.config.fast_delay_secs),
            )
            .await
        {
            Ok(outcome) => outcome,
            // The fast bundle is still worth archiving for its handles;
            // the full checkpoint will poll again anyway.
            Err(e) => {
                warn!("Fast checkpoint poll failed for {}: {}", document_id, e);
                PollOutcome {
                    proofs: Vec::new(),
                    unresolved: submission.handles.clone(),
                }
            }
        };

        let bundle = ProofBundle {
            document: document.body.clone(),
            proofs: outcome.proofs.into_iter().map(BundleProof::Plain).collect(),
            proof_handles: submission.handles.clone(),
        };
        let location = self.archive.write(document_id, &fingerprint, &bundle).await?;

        let task = AnchorTask {
            document_id: document_id.to_string(),
            fingerprint,
            handles: submission.handles,
            attempt: 0,
            due_at: now_secs() + self.config.full_delay_secs,
        };
        self.tasks.put(&task).map_err(PipelineError::TaskStore)?;
        info!(
            "Scheduled full-proof checkpoint for {} at {}",
            document_id, task.due_at
        );

        Ok(location)
    }

    /// Fan one fingerprint out across the selected nodes.
    async fn submit(
        &self,
        fingerprint: &Fingerprint,
        nodes: &[NodeEndpoint],
    ) -> PipelineResult<SubmissionOutcome> {
        let handles = self
            .network
            .submit_hashes(std::slice::from_ref(fingerprint), nodes)
            .await
            .map_err(|e| {
                warn!("Submission fan-out failed: {}", e);
                PipelineError::SubmissionFailed {
                    attempted: nodes.len(),
                }
            })?;

        if handles.is_empty() {
            return Err(PipelineError::SubmissionFailed {
                attempted: nodes.len(),
            });
        }

        Ok(SubmissionOutcome {
            rejected: nodes.len().saturating_sub(handles.len()),
            handles,
        })
    }

    /// Scheduler entry point for a due full-checkpoint task. The task
    /// has already been claimed from the store; on deferral or
    /// recoverable failure it is re-enqueued with backoff.
    pub async fn run_full_checkpoint(&self, task: AnchorTask) {
        if !self.try_claim(&task.document_id).await {
            // Another run owns this document; push the task back a tick.
            let mut deferred = task;
            deferred.due_at = now_secs() + self.config.scheduler_tick_secs;
            if let Err(e) = self.tasks.put(&deferred) {
                error!(
                    "Failed to requeue busy checkpoint task for {}: {}",
                    deferred.document_id, e
                );
            }
            return;
        }

        let result = self.full_checkpoint(&task).await;
        self.release(&task.document_id).await;

        match result {
            Ok(FullOutcome::Archived) => {
                info!("Full-proof bundle archived for {}", task.document_id)
            }
            Ok(FullOutcome::Deferred) => self.requeue(task, "no full anchor yet"),
            Err(e) => {
                error!("Full checkpoint failed for {}: {}", task.document_id, e);
                if task.attempt + 1 < self.config.max_poll_attempts {
                    self.requeue(task, "checkpoint errored");
                } else {
                    error!(
                        "Abandoning full-proof checkpoint for {} after {} attempts",
                        task.document_id,
                        task.attempt + 1
                    );
                }
            }
        }
    }

    /// Poll for matured proofs and, once a full anchor exists (or the
    /// retry budget is spent), verify and archive the upgraded bundle
    /// under the same key as the fast bundle.
    pub async fn full_checkpoint(&self, task: &AnchorTask) -> PipelineResult<FullOutcome> {
        let poller = MaturationPoller::new(Arc::clone(&self.network));
        // The scheduler already waited out the due time.
        let outcome = poller.await_proofs(&task.handles, Duration::ZERO).await?;

        let matured = outcome
            .proofs
            .iter()
            .any(|p| p.state() == ProofState::Full);
        let last_attempt = task.attempt + 1 >= self.config.max_poll_attempts;

        if !matured && !last_attempt {
            return Ok(FullOutcome::Deferred);
        }
        if !matured {
            warn!(
                "No full anchor for {} after {} polls; archiving what exists",
                task.document_id,
                task.attempt + 1
            );
        }

        let document = self
            .source
            .get_document(&task.document_id)
            .await
            .map_err(|e| PipelineError::DocumentFetch {
                id: task.document_id.clone(),
                source: e,
            })?;

        // The archive stays keyed by the fingerprint the proofs cover.
        // A document edited mid-wait triggers its own new run anyway.
        let current = crypto::fingerprint(&document, &self.config.fingerprint_secret);
        if current != task.fingerprint {
            warn!(
                "Document {} changed since anchoring; proofs cover the earlier revision",
                task.document_id
            );
        }

        let verifier = ProofVerifier::new(Arc::clone(&self.network));
        let verified = verifier.verify(&outcome.proofs).await;
        for entry in &verified {
            if !entry.all_ok() {
                warn!(
                    "Proof for handle {} on {} failed verification",
                    entry.proof.handle_id, task.document_id
                );
            }
        }

        let bundle = ProofBundle {
            document: document.body,
            proofs: verified.into_iter().map(BundleProof::Verified).collect(),
            proof_handles: task.handles.clone(),
        };
        self.archive
            .write(&task.document_id, &task.fingerprint, &bundle)
            .await?;

        Ok(FullOutcome::Archived)
    }

    /// Re-read a document's archived proof bundles and verify each one
    /// against the network as it stands today.
    pub async fn verify_stored_bundles(&self, document_id: &str) -> Result<Vec<BundleReview>> {
        let attachments = self.source.list_attachments(document_id).await?;
        let verifier = ProofVerifier::new(Arc::clone(&self.network));
        let mut reviews = Vec::new();

        for meta in attachments
            .into_iter()
            .filter(|a| a.file_name.ends_with(PROOF_SUFFIX))
        {
            let content = match self
                .source
                .get_attachment_content(document_id, &meta.file_name)
                .await
            {
                Ok(content) => content,
                Err(e) => {
                    warn!("Could not read attachment {}: {}", meta.file_name, e);
                    continue;
                }
            };

            match serde_json::from_slice::<ProofBundle>(&content) {
                Ok(bundle) => {
                    let proofs: Vec<Proof> = bundle
                        .proofs
                        .iter()
                        .map(|p| match p {
                            BundleProof::Plain(proof) => proof.clone(),
                            BundleProof::Verified(verified) => verified.proof.clone(),
                        })
                        .collect();
                    let verified = verifier.verify(&proofs).await;
                    reviews.push(BundleReview {
                        file_name: meta.file_name,
                        bundle: Some(bundle),
                        verified,
                    });
                }
                Err(e) => {
                    warn!("Attachment {} is not a proof bundle: {}", meta.file_name, e);
                    reviews.push(BundleReview {
                        file_name: meta.file_name,
                        bundle: None,
                        verified: Vec::new(),
                    });
                }
            }
        }

        Ok(reviews)
    }

    fn requeue(&self, task: AnchorTask, why: &str) {
        let attempt = task.attempt + 1;
        let delay = self
            .config
            .full_delay_secs
            .saturating_mul(1u64 << attempt.min(20))
            .min(self.config.max_backoff_secs);
        let next = AnchorTask {
            attempt,
            due_at: now_secs() + delay,
            ..task
        };

        info!(
            "Requeueing full checkpoint for {} ({}), attempt {}/{} in {}s",
            next.document_id, why, attempt, self.config.max_poll_attempts, delay
        );

        if let Err(e) = self.tasks.put(&next) {
            // Losing the task record means this document's full proof
            // will never be archived; make that loud.
            error!(
                "FAILED to persist checkpoint task for {}: {}",
                next.document_id, e
            );
        }
    }

    async fn try_claim(&self, document_id: &str) -> bool {
        self.in_flight.lock().await.insert(document_id.to_string())
    }

    async fn release(&self, document_id: &str) {
        self.in_flight.lock().await.remove(document_id);
    }
}
