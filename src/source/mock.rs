use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::traits::DocumentSource;
use crate::types::{AttachmentMeta, Document};

/// One stored attachment in the mock source.
#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Mock document source for testing.
///
/// Documents are seeded up front; attachments accumulate in memory with
/// replace-by-filename semantics, mirroring the real platform.
#[derive(Clone)]
pub struct MockSource {
    documents: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    attachments: Arc<Mutex<HashMap<String, Vec<StoredAttachment>>>>,
    fail_puts: Arc<Mutex<bool>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(HashMap::new())),
            attachments: Arc::new(Mutex::new(HashMap::new())),
            fail_puts: Arc::new(Mutex::new(false)),
        }
    }

    pub fn insert_document(&self, id: &str, body: serde_json::Value) {
        self.documents.lock().unwrap().insert(id.to_string(), body);
    }

    /// Make every attachment upload fail, for storage-failure tests.
    pub fn fail_puts(&self, fail: bool) {
        *self.fail_puts.lock().unwrap() = fail;
    }

    /// Attachments currently stored for a document (for assertions).
    pub fn attachments_for(&self, document_id: &str) -> Vec<StoredAttachment> {
        self.attachments
            .lock()
            .unwrap()
            .get(document_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSource for MockSource {
    fn name(&self) -> &'static str {
        "mock-document-source"
    }

    async fn get_document(&self, id: &str) -> Result<Document> {
        let documents = self.documents.lock().unwrap();
        let body = documents
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("document {} not found", id))?;
        Ok(Document {
            id: id.to_string(),
            body,
        })
    }

    async fn list_attachments(&self, document_id: &str) -> Result<Vec<AttachmentMeta>> {
        Ok(self
            .attachments_for(document_id)
            .into_iter()
            .map(|a| AttachmentMeta {
                file_name: a.file_name,
                mime_type: a.mime_type,
            })
            .collect())
    }

    async fn get_attachment_content(&self, document_id: &str, file_name: &str) -> Result<Vec<u8>> {
        self.attachments_for(document_id)
            .into_iter()
            .find(|a| a.file_name == file_name)
            .map(|a| a.content)
            .ok_or_else(|| anyhow!("attachment {} not found on {}", file_name, document_id))
    }

    async fn put_attachment(
        &self,
        document_id: &str,
        file_name: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<()> {
        if *self.fail_puts.lock().unwrap() {
            bail!("mock source: attachment storage unavailable");
        }

        let mut attachments = self.attachments.lock().unwrap();
        let entries = attachments.entry(document_id.to_string()).or_default();
        let stored = StoredAttachment {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            content: content.to_vec(),
        };

        // Replace-by-filename: a second upload supersedes, never duplicates.
        match entries.iter_mut().find(|a| a.file_name == file_name) {
            Some(existing) => *existing = stored,
            None => entries.push(stored),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_attachment_replaces_same_filename() {
        let source = MockSource::new();
        source.insert_document("inv-1", json!({"InvoiceID": "INV-1"}));

        source
            .put_attachment("inv-1", "a.txt", b"v1", "text/plain")
            .await
            .unwrap();
        source
            .put_attachment("inv-1", "a.txt", b"v2", "text/plain")
            .await
            .unwrap();

        let stored = source.attachments_for("inv-1");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, b"v2");
    }

    #[tokio::test]
    async fn test_missing_document_errors() {
        let source = MockSource::new();
        assert!(source.get_document("absent").await.is_err());
    }
}
