use std::sync::Arc;

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::network::AnchorNetworkVariant;
use crate::traits::AnchorNetwork;
use crate::types::{AnchorVerdict, Proof, ProofStep, VerifiedProof};

/// Evaluate a proof's anchor chain starting from the submitted
/// fingerprint. Returns the terminal root value (hex).
pub fn evaluate_chain(hash_hex: &str, steps: &[ProofStep]) -> Result<String> {
    let mut current = match hex::decode(hash_hex) {
        Ok(bytes) => bytes,
        Err(e) => bail!("proof hash is not hex: {}", e),
    };

    for step in steps {
        match step {
            ProofStep::Left(sibling) => {
                let mut joined = match hex::decode(sibling) {
                    Ok(bytes) => bytes,
                    Err(e) => bail!("left sibling is not hex: {}", e),
                };
                joined.extend_from_slice(&current);
                current = joined;
            }
            ProofStep::Right(sibling) => match hex::decode(sibling) {
                Ok(bytes) => current.extend_from_slice(&bytes),
                Err(e) => bail!("right sibling is not hex: {}", e),
            },
            ProofStep::Sha256 => {
                current = Sha256::digest(&current).to_vec();
            }
        }
    }

    Ok(hex::encode(current))
}

/// Independently validates retrieved proofs: recomputes each anchor
/// chain and checks every branch against the public ledger entry it
/// references.
pub struct ProofVerifier {
    network: Arc<AnchorNetworkVariant>,
}

impl ProofVerifier {
    pub fn new(network: Arc<AnchorNetworkVariant>) -> Self {
        Self { network }
    }

    /// Verify each proof in isolation: one result per input, order
    /// preserved. A proof that fails verification never aborts
    /// verification of its neighbors.
    pub async fn verify(&self, proofs: &[Proof]) -> Vec<VerifiedProof> {
        let mut verified = Vec::with_capacity(proofs.len());
        for proof in proofs {
            verified.push(self.verify_one(proof).await);
        }
        verified
    }

    async fn verify_one(&self, proof: &Proof) -> VerifiedProof {
        let computed = match evaluate_chain(&proof.hash, &proof.steps) {
            Ok(root) => root,
            Err(e) => {
                // Malformed chain: every branch inherits the failure.
                let verdicts = proof
                    .anchors
                    .iter()
                    .map(|branch| AnchorVerdict {
                        kind: branch.kind,
                        anchor_id: branch.anchor_id.clone(),
                        ok: false,
                        reason: Some(format!("malformed proof: {}", e)),
                    })
                    .collect();
                return VerifiedProof {
                    proof: proof.clone(),
                    verdicts,
                };
            }
        };

        let mut verdicts = Vec::with_capacity(proof.anchors.len());
        for branch in &proof.anchors {
            let verdict = if computed != branch.expected_value {
                AnchorVerdict {
                    kind: branch.kind,
                    anchor_id: branch.anchor_id.clone(),
                    ok: false,
                    reason: Some(format!(
                        "anchor chain mismatch: computed {}, branch claims {}",
                        computed, branch.expected_value
                    )),
                }
            } else {
                match self.network.resolve_anchor(branch).await {
                    Ok(ledger_value) if ledger_value == computed => AnchorVerdict {
                        kind: branch.kind,
                        anchor_id: branch.anchor_id.clone(),
                        ok: true,
                        reason: None,
                    },
                    Ok(ledger_value) => AnchorVerdict {
                        kind: branch.kind,
                        anchor_id: branch.anchor_id.clone(),
                        ok: false,
                        reason: Some(format!(
                            "ledger value mismatch: computed {}, ledger holds {}",
                            computed, ledger_value
                        )),
                    },
                    Err(e) => AnchorVerdict {
                        kind: branch.kind,
                        anchor_id: branch.anchor_id.clone(),
                        ok: false,
                        reason: Some(format!("ledger reference unreachable: {}", e)),
                    },
                }
            };
            verdicts.push(verdict);
        }

        debug!(
            "Verified proof for handle {}: {}/{} branches ok",
            proof.handle_id,
            verdicts.iter().filter(|v| v.ok).count(),
            verdicts.len()
        );

        VerifiedProof {
            proof: proof.clone(),
            verdicts,
        }
    }
}
