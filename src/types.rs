use serde::{Deserialize, Serialize};

/// Identifier of a source document (e.g. an invoice id in the ledger API).
pub type DocumentId = String;

/// A source document snapshot: its identifier plus the full JSON body as
/// returned by the document source. The body is what gets fingerprinted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub body: serde_json::Value,
}

/// Hex-encoded keyed digest (HMAC-SHA256) of a document's canonical form.
///
/// Identical document content always yields the identical fingerprint for
/// a fixed secret. Used as the primary key of archived proof bundles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One reachable anchoring-network node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    /// Base URI of the node, e.g. "https://node-a.example.org".
    pub uri: String,
}

/// Opaque reference issued by an anchoring node for one pending proof.
///
/// One fingerprint maps to up to one handle per node contacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofHandle {
    /// Node-assigned id used to query proof status.
    pub handle_id: String,
    /// Node that accepted the submission.
    pub node_uri: String,
    /// Fingerprint (hex) this handle tracks.
    pub hash: String,
}

/// Ledger layer an anchor branch commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    /// Fast intermediate calendar layer (minutes).
    Cal,
    /// Terminal public ledger (hours).
    Btc,
}

/// Terminal commitment of one branch of a proof's anchor chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorBranch {
    pub kind: AnchorKind,
    /// Ledger entry id this branch points at.
    pub anchor_id: String,
    /// URIs where the ledger entry can be resolved.
    pub uris: Vec<String>,
    /// Root value (hex) the chain is expected to evaluate to.
    pub expected_value: String,
}

/// One operation of an anchor chain. Evaluation starts from the submitted
/// fingerprint and applies steps in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofStep {
    /// Prepend the sibling (hex) to the running value.
    Left(String),
    /// Append the sibling (hex) to the running value.
    Right(String),
    /// Hash the running value with SHA-256.
    Sha256,
}

/// Maturation state of a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofState {
    /// Anchored only to the fast calendar layer.
    Partial,
    /// Anchored to the terminal public ledger.
    Full,
}

/// A proof returned by the anchoring network for one handle.
///
/// Progresses strictly partial -> full over time; never regresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    pub handle_id: String,
    pub node_uri: String,
    /// Fingerprint (hex) the proof covers.
    pub hash: String,
    /// Anchor chain from the fingerprint to the branch roots.
    pub steps: Vec<ProofStep>,
    pub anchors: Vec<AnchorBranch>,
    /// UTC unix seconds at retrieval.
    pub retrieved_at: u64,
}

impl Proof {
    pub fn state(&self) -> ProofState {
        if self.anchors.iter().any(|a| a.kind == AnchorKind::Btc) {
            ProofState::Full
        } else {
            ProofState::Partial
        }
    }
}

/// Verification result for one anchor branch of a proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorVerdict {
    pub kind: AnchorKind,
    pub anchor_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A proof plus its per-branch verification results. Only ever persisted
/// inside a proof bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedProof {
    #[serde(flatten)]
    pub proof: Proof,
    pub verdicts: Vec<AnchorVerdict>,
}

impl VerifiedProof {
    pub fn all_ok(&self) -> bool {
        !self.verdicts.is_empty() && self.verdicts.iter().all(|v| v.ok)
    }
}

/// Proof entry inside an archived bundle: verified once the full
/// checkpoint has run, plain before that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleProof {
    Verified(VerifiedProof),
    Plain(Proof),
}

/// The durable artifact attached to a document: its snapshot, the proof
/// handles issued for it, and the current proof set.
///
/// Key names are fixed by the persisted artifact format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    pub document: serde_json::Value,
    pub proofs: Vec<BundleProof>,
    pub proof_handles: Vec<ProofHandle>,
}

/// Attachment metadata from the document source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMeta {
    pub file_name: String,
    pub mime_type: String,
}

/// Where an archived bundle landed.
#[derive(Debug, Clone)]
pub struct ArchiveLocation {
    /// Derived attachment filename, `<fingerprint>-cp-proofs.txt`.
    pub filename: String,
    /// Local spool copy written before upload.
    pub spool_path: std::path::PathBuf,
}

/// Intake event unit: a document changed and should be anchored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRequest {
    pub document_id: DocumentId,
}

/// Durable record of a pending full-proof checkpoint.
///
/// Persisted in the task store so the hours-long maturation wait survives
/// process restarts; keyed by `due_at || document_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorTask {
    pub document_id: DocumentId,
    pub fingerprint: Fingerprint,
    pub handles: Vec<ProofHandle>,
    /// Full-checkpoint polls already spent on this document.
    pub attempt: u32,
    /// UTC unix seconds at which the next poll is due.
    pub due_at: u64,
}

/// Outcome of fanning a submission out across nodes. Partial acceptance
/// is a valid result as long as at least one handle came back.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub handles: Vec<ProofHandle>,
    /// Nodes that rejected or timed out.
    pub rejected: usize,
}

/// Outcome of one batched status query. Handles that did not resolve are
/// reported, not retried, within the call.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub proofs: Vec<Proof>,
    pub unresolved: Vec<ProofHandle>,
}
