use std::sync::Arc;

use anyhow::{Context, Result};
use rocksdb::{Options, DB};

use crate::types::AnchorTask;

const TS_LEN: usize = 8;

/// Durable store for pending full-proof checkpoint tasks (RocksDB).
///
/// Keys are `due_at` (big-endian seconds) followed by the document id,
/// so iteration order is due order and a scan can stop at the first
/// not-yet-due entry. Tasks written here survive process restarts; the
/// scheduler rescans on startup and picks up whatever came due while the
/// process was down.
pub struct TaskStore {
    db: Arc<DB>,
}

impl TaskStore {
    pub fn open(path: &str) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).context("task store open failed")?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Encode composite key: due_at_be || document_id
    fn encode_key(due_at: u64, document_id: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TS_LEN + document_id.len());
        buf.extend_from_slice(&due_at.to_be_bytes());
        buf.extend_from_slice(document_id.as_bytes());
        buf
    }

    fn decode_due(key: &[u8]) -> Option<u64> {
        let ts: [u8; TS_LEN] = key.get(..TS_LEN)?.try_into().ok()?;
        Some(u64::from_be_bytes(ts))
    }

    pub fn put(&self, task: &AnchorTask) -> Result<()> {
        let key = Self::encode_key(task.due_at, &task.document_id);
        let value = serde_json::to_vec(task).context("task serialization failed")?;
        self.db.put(key, value).context("task write failed")?;
        Ok(())
    }

    pub fn remove(&self, task: &AnchorTask) -> Result<()> {
        let key = Self::encode_key(task.due_at, &task.document_id);
        self.db.delete(key).context("task delete failed")?;
        Ok(())
    }

    /// Tasks whose due time has passed, in due order.
    pub fn due(&self, now: u64) -> Result<Vec<AnchorTask>> {
        let mut tasks = Vec::new();
        for entry in self.db.iterator(rocksdb::IteratorMode::Start) {
            let (key, value) = entry.context("task scan failed")?;
            match Self::decode_due(&key) {
                Some(due_at) if due_at <= now => {
                    let task: AnchorTask = serde_json::from_slice(&value)
                        .context("task deserialization failed")?;
                    tasks.push(task);
                }
                // Keys iterate in due order, so the first future entry
                // ends the scan.
                _ => break,
            }
        }
        Ok(tasks)
    }

    /// All pending tasks regardless of due time.
    pub fn pending(&self) -> Result<Vec<AnchorTask>> {
        let mut tasks = Vec::new();
        for entry in self.db.iterator(rocksdb::IteratorMode::Start) {
            let (_, value) = entry.context("task scan failed")?;
            let task: AnchorTask =
                serde_json::from_slice(&value).context("task deserialization failed")?;
            tasks.push(task);
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fingerprint;

    fn task(document_id: &str, due_at: u64, attempt: u32) -> AnchorTask {
        AnchorTask {
            document_id: document_id.to_string(),
            fingerprint: Fingerprint::from_hex("ab".repeat(32)),
            handles: Vec::new(),
            attempt,
            due_at,
        }
    }

    #[test]
    fn test_due_returns_only_elapsed_tasks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(dir.path().to_str().unwrap()).unwrap();

        store.put(&task("doc-b", 20, 0)).unwrap();
        store.put(&task("doc-a", 10, 0)).unwrap();
        store.put(&task("doc-c", 30, 0)).unwrap();

        let due = store.due(20).unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].document_id, "doc-a");
        assert_eq!(due[1].document_id, "doc-b");
    }

    #[test]
    fn test_remove_deletes_exactly_one_task() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(dir.path().to_str().unwrap()).unwrap();

        let first = task("doc-a", 10, 0);
        store.put(&first).unwrap();
        store.put(&task("doc-a", 40, 1)).unwrap();

        store.remove(&first).unwrap();
        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].due_at, 40);
    }

    #[test]
    fn test_tasks_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();

        {
            let store = TaskStore::open(&path).unwrap();
            store.put(&task("doc-a", 10, 2)).unwrap();
        }

        let store = TaskStore::open(&path).unwrap();
        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].document_id, "doc-a");
        assert_eq!(pending[0].attempt, 2);
    }

    #[test]
    fn test_same_document_different_due_times_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(dir.path().to_str().unwrap()).unwrap();

        store.put(&task("doc-a", 10, 0)).unwrap();
        store.put(&task("doc-a", 20, 1)).unwrap();
        assert_eq!(store.pending().unwrap().len(), 2);
    }
}
