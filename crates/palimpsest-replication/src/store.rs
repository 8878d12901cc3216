//! Lock-guarded session-to-document map.

use palimpsest_crdt::{CrdtError, Document, Element, Merge, OpId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Every document this worker holds, keyed by session identifier.
///
/// Documents live for the process lifetime; there is no eviction. Mutation
/// happens under the write lock only, from the local insert path, the
/// inbound merge path, and snapshot installs.
#[derive(Default)]
pub struct DocumentStore {
    docs: RwLock<HashMap<String, Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document for a new session. Existing state for the
    /// session is left untouched.
    pub fn create(&self, session_id: &str) {
        self.docs
            .write()
            .entry(session_id.to_string())
            .or_insert_with(Document::new);
    }

    /// Install a snapshot wholesale, replacing any partial local state.
    pub fn install(&self, session_id: &str, document: Document) {
        self.docs.write().insert(session_id.to_string(), document);
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.docs.read().contains_key(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.docs.read().keys().cloned().collect()
    }

    /// A full copy of one session's document, for snapshot transfer.
    pub fn snapshot(&self, session_id: &str) -> Option<Document> {
        self.docs.read().get(session_id).cloned()
    }

    /// The rendered text of one session.
    pub fn text(&self, session_id: &str) -> Option<String> {
        self.docs.read().get(session_id).map(|doc| doc.text())
    }

    /// Locally authored insert; mints the operation identifier under the
    /// same lock that applies it.
    pub fn insert_after(
        &self,
        session_id: &str,
        reference: OpId,
        client_id: &str,
        text: &str,
    ) -> Result<Element, CrdtError> {
        let mut docs = self.docs.write();
        let doc = docs
            .get_mut(session_id)
            .ok_or_else(|| CrdtError::UnknownSession(session_id.to_string()))?;
        doc.insert_after(reference, session_id, client_id, text)
    }

    /// Merge one element into its session's document.
    pub fn integrate(&self, session_id: &str, element: Element) -> Result<Merge, CrdtError> {
        let mut docs = self.docs.write();
        let doc = docs
            .get_mut(session_id)
            .ok_or_else(|| CrdtError::UnknownSession(session_id.to_string()))?;
        doc.integrate(element)
    }
}
