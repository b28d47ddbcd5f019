use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::source::DocumentSourceVariant;
use crate::traits::DocumentSource;
use crate::types::{ArchiveLocation, Fingerprint, ProofBundle};

/// Suffix of every archived proof bundle attachment.
pub const PROOF_SUFFIX: &str = "-cp-proofs.txt";

/// MIME type the bundle is attached under.
pub const PROOF_MIME: &str = "text/plain";

/// Packages a document's proof lifecycle into a single bundle and
/// persists it as an attachment on the document.
///
/// The attachment name is derived from the document's fingerprint, so a
/// later write for the same document supersedes the earlier one instead
/// of accumulating conflicting artifacts. The bundle is spooled to the
/// local filesystem before upload.
pub struct ProofArchive {
    source: Arc<DocumentSourceVariant>,
    spool_dir: PathBuf,
}

impl ProofArchive {
    pub fn new(source: Arc<DocumentSourceVariant>, spool_dir: PathBuf) -> Self {
        Self { source, spool_dir }
    }

    /// Deterministic attachment name for a fingerprint.
    pub fn proof_filename(fingerprint: &Fingerprint) -> String {
        format!("{}{}", fingerprint.as_hex(), PROOF_SUFFIX)
    }

    /// Serialize the bundle, spool it locally, and attach it to the
    /// document, replacing any prior attachment with the same name.
    ///
    /// Failures here are fatal for the pipeline run: a proof that was
    /// not persisted must not be reported as anchored.
    pub async fn write(
        &self,
        document_id: &str,
        fingerprint: &Fingerprint,
        bundle: &ProofBundle,
    ) -> PipelineResult<ArchiveLocation> {
        let filename = Self::proof_filename(fingerprint);

        let bytes = serde_json::to_vec(bundle).map_err(|e| PipelineError::ArchiveWrite {
            filename: filename.clone(),
            source: anyhow::Error::new(e).context("bundle serialization failed"),
        })?;

        let spool_path = self.spool_dir.join(&filename);
        let spool = async {
            tokio::fs::create_dir_all(&self.spool_dir)
                .await
                .context("spool directory creation failed")?;
            tokio::fs::write(&spool_path, &bytes)
                .await
                .context("spool write failed")
        };
        spool.await.map_err(|e| PipelineError::ArchiveWrite {
            filename: filename.clone(),
            source: e,
        })?;

        self.source
            .put_attachment(document_id, &filename, &bytes, PROOF_MIME)
            .await
            .map_err(|e| PipelineError::ArchiveWrite {
                filename: filename.clone(),
                source: e,
            })?;

        info!(
            "Archived proof bundle {} ({} bytes) on document {}",
            filename,
            bytes.len(),
            document_id
        );

        Ok(ArchiveLocation {
            filename,
            spool_path,
        })
    }
}
