//! Unit tests for the pipeline step logic, driven over mock seams.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use crate::archive::ProofArchive;
use crate::config::BaseConfig;
use crate::error::PipelineError;
use crate::network::{AnchorNetworkVariant, MockAnchorNetwork};
use crate::source::{DocumentSourceVariant, MockSource};
use crate::task_store::TaskStore;
use crate::traits::DocumentSource;
use crate::types::{AnchorTask, BundleProof, ProofBundle, ProofState};

use super::core::PipelineContext;
use super::steps::FullOutcome;
use super::tasks::now_secs;

// ==================== TEST HELPERS ====================

fn test_config(dir: &tempfile::TempDir) -> BaseConfig {
    BaseConfig {
        task_store_path: dir.path().join("tasks").to_str().unwrap().to_string(),
        spool_dir: dir.path().join("spool").to_str().unwrap().to_string(),
        fast_delay_secs: 0,
        full_delay_secs: 0,
        scheduler_tick_secs: 1,
        max_poll_attempts: 3,
        submit_node_count: 2,
        ..BaseConfig::default()
    }
}

fn test_context(
    dir: &tempfile::TempDir,
    network: MockAnchorNetwork,
    source: MockSource,
) -> PipelineContext {
    let config = test_config(dir);
    let network = Arc::new(AnchorNetworkVariant::Mock(network));
    let source = Arc::new(DocumentSourceVariant::Mock(source));
    let archive = Arc::new(ProofArchive::new(
        Arc::clone(&source),
        PathBuf::from(&config.spool_dir),
    ));
    let tasks = Arc::new(TaskStore::open(&config.task_store_path).unwrap());

    PipelineContext {
        network,
        source,
        archive,
        tasks,
        config,
        in_flight: Arc::new(tokio::sync::Mutex::new(HashSet::new())),
    }
}

fn seeded_source() -> MockSource {
    let source = MockSource::new();
    source.insert_document("inv-1", json!({"InvoiceID": "INV-1", "Total": 100}));
    source
}

fn stored_bundle(source: &MockSource, document_id: &str) -> ProofBundle {
    let stored = source.attachments_for(document_id);
    assert_eq!(stored.len(), 1, "exactly one proof attachment expected");
    serde_json::from_slice(&stored[0].content).unwrap()
}

// ==================== FAST CHECKPOINT ====================

#[tokio::test]
async fn test_fast_checkpoint_archives_v1_and_schedules_task() {
    let dir = tempfile::tempdir().unwrap();
    let source = seeded_source();
    let ctx = test_context(&dir, MockAnchorNetwork::new(), source.clone());

    let before = now_secs();
    let location = ctx.fast_checkpoint("inv-1").await.unwrap();
    assert!(location.filename.ends_with("-cp-proofs.txt"));

    let bundle = stored_bundle(&source, "inv-1");
    assert_eq!(bundle.proof_handles.len(), 2, "one handle per node");
    assert_eq!(bundle.proofs.len(), 2);
    for proof in &bundle.proofs {
        match proof {
            BundleProof::Plain(p) => assert_eq!(p.state(), ProofState::Partial),
            BundleProof::Verified(_) => panic!("fast bundle must not carry verdicts"),
        }
    }

    let pending = ctx.tasks.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].document_id, "inv-1");
    assert_eq!(pending[0].attempt, 0);
    assert!(pending[0].due_at >= before);
}

#[tokio::test]
async fn test_no_nodes_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockAnchorNetwork::new();
    network.clear_nodes();
    let ctx = test_context(&dir, network, seeded_source());

    let result = ctx.fast_checkpoint("inv-1").await;
    assert!(matches!(result, Err(PipelineError::NoNodes)));
    assert!(ctx.tasks.pending().unwrap().is_empty());
}

#[tokio::test]
async fn test_all_nodes_rejecting_fails_submission() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockAnchorNetwork::new();
    network.reject_node("mock://node-1");
    network.reject_node("mock://node-2");
    let ctx = test_context(&dir, network, seeded_source());

    let result = ctx.fast_checkpoint("inv-1").await;
    assert!(matches!(
        result,
        Err(PipelineError::SubmissionFailed { attempted: 2 })
    ));
}

#[tokio::test]
async fn test_partial_node_acceptance_still_anchors() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockAnchorNetwork::new();
    network.reject_node("mock://node-2");
    let source = seeded_source();
    let ctx = test_context(&dir, network, source.clone());

    ctx.fast_checkpoint("inv-1").await.unwrap();

    let bundle = stored_bundle(&source, "inv-1");
    assert_eq!(bundle.proof_handles.len(), 1);
    assert_eq!(bundle.proof_handles[0].node_uri, "mock://node-1");
}

#[tokio::test]
async fn test_archive_failure_is_fatal_and_schedules_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = seeded_source();
    source.fail_puts(true);
    let ctx = test_context(&dir, MockAnchorNetwork::new(), source);

    let result = ctx.fast_checkpoint("inv-1").await;
    assert!(matches!(result, Err(PipelineError::ArchiveWrite { .. })));
    assert!(ctx.tasks.pending().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_document_reports_fetch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(&dir, MockAnchorNetwork::new(), MockSource::new());

    let result = ctx.fast_checkpoint("ghost").await;
    assert!(matches!(result, Err(PipelineError::DocumentFetch { .. })));
}

// ==================== FULL CHECKPOINT ====================

async fn run_fast_then_claim(ctx: &PipelineContext) -> AnchorTask {
    ctx.fast_checkpoint("inv-1").await.unwrap();
    let task = ctx.tasks.pending().unwrap().remove(0);
    ctx.tasks.remove(&task).unwrap();
    task
}

#[tokio::test]
async fn test_full_checkpoint_upgrades_bundle_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let source = seeded_source();
    let ctx = test_context(&dir, MockAnchorNetwork::new(), source.clone());

    let task = run_fast_then_claim(&ctx).await;
    let v1 = stored_bundle(&source, "inv-1");

    // Second poll matures the btc branch in the mock.
    let outcome = ctx.full_checkpoint(&task).await.unwrap();
    assert_eq!(outcome, FullOutcome::Archived);

    let v2 = stored_bundle(&source, "inv-1");
    assert_eq!(v2.proof_handles, v1.proof_handles);
    assert_eq!(v2.proofs.len(), 2);
    for proof in &v2.proofs {
        match proof {
            BundleProof::Verified(v) => {
                assert_eq!(v.proof.state(), ProofState::Full);
                assert!(v.all_ok());
            }
            BundleProof::Plain(_) => panic!("full bundle must carry verdicts"),
        }
    }
}

#[tokio::test]
async fn test_immature_proofs_defer_the_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockAnchorNetwork::new();
    network.set_full_after_polls(10);
    let source = seeded_source();
    let ctx = test_context(&dir, network, source.clone());

    let task = run_fast_then_claim(&ctx).await;
    let outcome = ctx.full_checkpoint(&task).await.unwrap();
    assert_eq!(outcome, FullOutcome::Deferred);

    // v1 stays in place untouched.
    let bundle = stored_bundle(&source, "inv-1");
    assert!(matches!(bundle.proofs[0], BundleProof::Plain(_)));
}

#[tokio::test]
async fn test_requeue_applies_backoff_and_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockAnchorNetwork::new();
    network.set_full_after_polls(10);
    let ctx = test_context(&dir, network, seeded_source());

    let task = run_fast_then_claim(&ctx).await;
    ctx.run_full_checkpoint(task).await;

    let pending = ctx.tasks.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempt, 1);
}

#[tokio::test]
async fn test_exhausted_attempts_archive_what_exists() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockAnchorNetwork::new();
    network.set_full_after_polls(100); // never matures
    let source = seeded_source();
    let ctx = test_context(&dir, network, source.clone());

    let mut task = run_fast_then_claim(&ctx).await;
    task.attempt = ctx.config.max_poll_attempts - 1;

    let outcome = ctx.full_checkpoint(&task).await.unwrap();
    assert_eq!(outcome, FullOutcome::Archived);

    let bundle = stored_bundle(&source, "inv-1");
    for proof in &bundle.proofs {
        match proof {
            BundleProof::Verified(v) => assert_eq!(v.proof.state(), ProofState::Partial),
            BundleProof::Plain(_) => panic!("final bundle must carry verdicts"),
        }
    }
}

#[tokio::test]
async fn test_verification_isolation_marks_only_the_bad_proof() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockAnchorNetwork::new();
    network.corrupt_ledger_for("mock://node-1");
    let source = seeded_source();
    let ctx = test_context(&dir, network, source.clone());

    let task = run_fast_then_claim(&ctx).await;
    let outcome = ctx.full_checkpoint(&task).await.unwrap();
    assert_eq!(outcome, FullOutcome::Archived, "write still occurs");

    let bundle = stored_bundle(&source, "inv-1");
    let mut ok_by_node = std::collections::HashMap::new();
    for proof in &bundle.proofs {
        match proof {
            BundleProof::Verified(v) => {
                ok_by_node.insert(v.proof.node_uri.clone(), v.all_ok());
            }
            BundleProof::Plain(_) => panic!("full bundle must carry verdicts"),
        }
    }
    assert_eq!(ok_by_node["mock://node-1"], false);
    assert_eq!(ok_by_node["mock://node-2"], true);
}

// ==================== GUARDS AND REVIEWS ====================

#[tokio::test]
async fn test_in_flight_document_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = seeded_source();
    let ctx = test_context(&dir, MockAnchorNetwork::new(), source.clone());

    ctx.in_flight.lock().await.insert("inv-1".to_string());
    ctx.run_anchoring_pipeline("inv-1").await;

    assert!(source.attachments_for("inv-1").is_empty());
    assert!(ctx.tasks.pending().unwrap().is_empty());
}

#[tokio::test]
async fn test_verify_stored_bundles_reviews_archived_proofs() {
    let dir = tempfile::tempdir().unwrap();
    let source = seeded_source();
    let ctx = test_context(&dir, MockAnchorNetwork::new(), source.clone());

    let task = run_fast_then_claim(&ctx).await;
    ctx.full_checkpoint(&task).await.unwrap();

    // An unrelated attachment must be ignored by the review.
    source
        .put_attachment("inv-1", "note.pdf", b"pdf", "application/pdf")
        .await
        .unwrap();

    let reviews = ctx.verify_stored_bundles("inv-1").await.unwrap();
    assert_eq!(reviews.len(), 1);
    let review = &reviews[0];
    assert!(review.bundle.is_some());
    assert_eq!(review.verified.len(), 2);
    assert!(review.verified.iter().all(|v| v.all_ok()));
}
