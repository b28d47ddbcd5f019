use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::traits::DocumentSource;
use crate::types::{AttachmentMeta, Document};

/// REST client for the document source (accounting platform).
///
/// # Protocol
/// - `GET {base}/invoices/{id}` - current document state (JSON)
/// - `GET {base}/invoices/{id}/attachments` - attachment metadata list
/// - `GET {base}/invoices/{id}/attachments/{name}` - attachment content
/// - `PUT {base}/invoices/{id}/attachments/{name}` - upload/replace
pub struct HttpDocumentSource {
    client: Client,
    base_uri: String,
    bearer_token: String,
}

impl HttpDocumentSource {
    pub fn new(base_uri: String, bearer_token: String) -> Self {
        Self {
            client: Client::new(),
            base_uri,
            bearer_token,
        }
    }

    fn invoice_url(&self, id: &str) -> String {
        format!("{}/invoices/{}", self.base_uri, id)
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    fn name(&self) -> &'static str {
        "http-document-source"
    }

    async fn get_document(&self, id: &str) -> Result<Document> {
        let body: serde_json::Value = self
            .client
            .get(self.invoice_url(id))
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .with_context(|| format!("document fetch for {} failed", id))?
            .error_for_status()
            .with_context(|| format!("document fetch for {} rejected", id))?
            .json()
            .await
            .with_context(|| format!("document {} returned malformed JSON", id))?;

        Ok(Document {
            id: id.to_string(),
            body,
        })
    }

    async fn list_attachments(&self, document_id: &str) -> Result<Vec<AttachmentMeta>> {
        self.client
            .get(format!("{}/attachments", self.invoice_url(document_id)))
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .context("attachment list request failed")?
            .error_for_status()
            .context("attachment list rejected")?
            .json()
            .await
            .context("attachment list returned malformed JSON")
    }

    async fn get_attachment_content(&self, document_id: &str, file_name: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(format!(
                "{}/attachments/{}",
                self.invoice_url(document_id),
                file_name
            ))
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .context("attachment download failed")?
            .error_for_status()
            .context("attachment download rejected")?
            .bytes()
            .await
            .context("attachment body read failed")?;

        Ok(bytes.to_vec())
    }

    async fn put_attachment(
        &self,
        document_id: &str,
        file_name: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<()> {
        debug!(
            "Uploading attachment {} ({} bytes) to document {}",
            file_name,
            content.len(),
            document_id
        );

        let response = self
            .client
            .put(format!(
                "{}/attachments/{}",
                self.invoice_url(document_id),
                file_name
            ))
            .bearer_auth(&self.bearer_token)
            .header("content-type", mime_type.to_string())
            .body(content.to_vec())
            .send()
            .await
            .context("attachment upload failed")?;

        if !response.status().is_success() {
            bail!(
                "attachment upload for {} rejected: {}",
                document_id,
                response.status()
            );
        }
        Ok(())
    }
}
