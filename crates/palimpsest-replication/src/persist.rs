//! Persistence seam for document snapshots.
//!
//! Durable storage is not implemented by the worker; this trait is the
//! point a storage backend plugs into. The default implementation keeps
//! everything process-lifetime only.

use async_trait::async_trait;
use palimpsest_crdt::Document;

/// Backend for durably storing and recovering session snapshots.
#[async_trait]
pub trait SnapshotPersistence: Send + Sync {
    /// Persist one session's full document.
    async fn persist(&self, session_id: &str, document: &Document) -> std::io::Result<()>;

    /// Load a previously persisted document, if any.
    async fn load(&self, session_id: &str) -> std::io::Result<Option<Document>>;
}

/// No-op backend: documents live only in process memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPersistence;

#[async_trait]
impl SnapshotPersistence for NullPersistence {
    async fn persist(&self, _session_id: &str, _document: &Document) -> std::io::Result<()> {
        Ok(())
    }

    async fn load(&self, _session_id: &str) -> std::io::Result<Option<Document>> {
        Ok(None)
    }
}
