use anyhow::Result;
use async_trait::async_trait;

use crate::types::{AttachmentMeta, Document};

/// The document source (accounting platform) the pipeline anchors
/// documents from and attaches proof bundles to.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Human-readable source name for logging.
    fn name(&self) -> &'static str;

    /// Fetch the current state of a document.
    async fn get_document(&self, id: &str) -> Result<Document>;

    /// List attachment metadata for a document.
    async fn list_attachments(&self, document_id: &str) -> Result<Vec<AttachmentMeta>>;

    /// Download one attachment's content.
    async fn get_attachment_content(&self, document_id: &str, file_name: &str) -> Result<Vec<u8>>;

    /// Upload an attachment, replacing any prior attachment with the
    /// same file name on the same document.
    async fn put_attachment(
        &self,
        document_id: &str,
        file_name: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<()>;
}
