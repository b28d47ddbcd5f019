use anyhow::Result;
use async_trait::async_trait;

use super::http::HttpDocumentSource;
use super::mock::MockSource;
use super::noop::NoopSource;
use crate::traits::DocumentSource;
use crate::types::{AttachmentMeta, Document};

/// Enum representing all possible document source implementations.
pub enum DocumentSourceVariant {
    Noop(NoopSource),
    Mock(MockSource),
    Http(HttpDocumentSource),
}

#[async_trait]
impl DocumentSource for DocumentSourceVariant {
    fn name(&self) -> &'static str {
        match self {
            DocumentSourceVariant::Noop(inner) => inner.name(),
            DocumentSourceVariant::Mock(inner) => inner.name(),
            DocumentSourceVariant::Http(inner) => inner.name(),
        }
    }

    async fn get_document(&self, id: &str) -> Result<Document> {
        match self {
            DocumentSourceVariant::Noop(inner) => inner.get_document(id).await,
            DocumentSourceVariant::Mock(inner) => inner.get_document(id).await,
            DocumentSourceVariant::Http(inner) => inner.get_document(id).await,
        }
    }

    async fn list_attachments(&self, document_id: &str) -> Result<Vec<AttachmentMeta>> {
        match self {
            DocumentSourceVariant::Noop(inner) => inner.list_attachments(document_id).await,
            DocumentSourceVariant::Mock(inner) => inner.list_attachments(document_id).await,
            DocumentSourceVariant::Http(inner) => inner.list_attachments(document_id).await,
        }
    }

    async fn get_attachment_content(&self, document_id: &str, file_name: &str) -> Result<Vec<u8>> {
        match self {
            DocumentSourceVariant::Noop(inner) => {
                inner.get_attachment_content(document_id, file_name).await
            }
            DocumentSourceVariant::Mock(inner) => {
                inner.get_attachment_content(document_id, file_name).await
            }
            DocumentSourceVariant::Http(inner) => {
                inner.get_attachment_content(document_id, file_name).await
            }
        }
    }

    async fn put_attachment(
        &self,
        document_id: &str,
        file_name: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<()> {
        match self {
            DocumentSourceVariant::Noop(inner) => {
                inner
                    .put_attachment(document_id, file_name, content, mime_type)
                    .await
            }
            DocumentSourceVariant::Mock(inner) => {
                inner
                    .put_attachment(document_id, file_name, content, mime_type)
                    .await
            }
            DocumentSourceVariant::Http(inner) => {
                inner
                    .put_attachment(document_id, file_name, content, mime_type)
                    .await
            }
        }
    }
}
