use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::traits::DocumentSource;
use crate::types::{AttachmentMeta, Document};

/// Noop document source for the default initialization path.
pub struct NoopSource;

#[async_trait]
impl DocumentSource for NoopSource {
    fn name(&self) -> &'static str {
        "noop-document-source"
    }

    async fn get_document(&self, id: &str) -> Result<Document> {
        bail!("no document source configured (requested {})", id)
    }

    async fn list_attachments(&self, _document_id: &str) -> Result<Vec<AttachmentMeta>> {
        Ok(Vec::new())
    }

    async fn get_attachment_content(&self, document_id: &str, file_name: &str) -> Result<Vec<u8>> {
        bail!(
            "no document source configured (requested {} on {})",
            file_name,
            document_id
        )
    }

    async fn put_attachment(
        &self,
        document_id: &str,
        _file_name: &str,
        _content: &[u8],
        _mime_type: &str,
    ) -> Result<()> {
        bail!("no document source configured (upload to {})", document_id)
    }
}
