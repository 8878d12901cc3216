//! The replication engine: push, merge, and session bootstrap.

use crate::error::ReplicationError;
use crate::persist::{NullPersistence, SnapshotPersistence};
use crate::store::DocumentStore;
use futures::future::join_all;
use palimpsest_crdt::{CrdtError, EditBuffer, Element, Merge, OpId};
use palimpsest_mesh::PeerRegistry;
use palimpsest_wire::{PeerRequest, PeerResponse};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns local edits into peer batches and merges remote batches back in.
///
/// All shared structures (the edit buffer, the parked-operation maps) are
/// mutated under their own lock; the document map is guarded inside
/// [`DocumentStore`].
pub struct ReplicationEngine {
    store: Arc<DocumentStore>,
    /// Identifier this worker stamps on elements it originates.
    client_id: String,
    buffer: Mutex<EditBuffer>,
    /// Operations whose reference has not arrived yet, keyed by the
    /// missing reference identifier. Replayed when it shows up.
    pending: Mutex<HashMap<OpId, Vec<Element>>>,
    /// Inbound operations for sessions whose snapshot bootstrap is still
    /// in flight; replayed once the snapshot is installed.
    gated: Mutex<HashMap<String, Vec<Element>>>,
    persistence: Arc<dyn SnapshotPersistence>,
}

impl ReplicationEngine {
    pub fn new(store: Arc<DocumentStore>, client_id: impl Into<String>) -> Self {
        Self::with_persistence(store, client_id, Arc::new(NullPersistence))
    }

    pub fn with_persistence(
        store: Arc<DocumentStore>,
        client_id: impl Into<String>,
        persistence: Arc<dyn SnapshotPersistence>,
    ) -> Self {
        Self {
            store,
            client_id: client_id.into(),
            buffer: Mutex::new(EditBuffer::new()),
            pending: Mutex::new(HashMap::new()),
            gated: Mutex::new(HashMap::new()),
            persistence,
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Number of elements awaiting the next push cycle.
    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Locally authored insert: resolve, then queue for fan-out.
    pub fn local_insert(
        &self,
        session_id: &str,
        reference: OpId,
        text: &str,
    ) -> Result<Element, CrdtError> {
        let element = self
            .store
            .insert_after(session_id, reference, &self.client_id, text)?;
        self.buffer.lock().push(element.clone());
        Ok(element)
    }

    /// Merge entry point for edits arriving from this worker's own clients
    /// (Element-shaped payloads from the gateway). Resolved like any other
    /// element; when applied, the edit is queued for fan-out since this
    /// worker is its origin within the mesh.
    pub fn submit_edit(&self, element: Element) {
        if self.apply_one(element.clone()) {
            self.buffer.lock().push(element);
        }
    }

    /// Merge a batch of remote operations, possibly spanning several
    /// sessions. Safe under duplicated and reordered delivery; one
    /// session's reject does not affect another's.
    pub fn apply_remote(&self, ops: Vec<Element>) {
        for op in ops {
            self.apply_one(op);
        }
    }

    /// Returns true when the element was newly applied to its document.
    fn apply_one(&self, op: Element) -> bool {
        if op.deleted {
            warn!(id = %op.id, "discarding delete operation: no resolution rule");
            return false;
        }
        {
            let mut gated = self.gated.lock();
            if let Some(parked) = gated.get_mut(&op.session_id) {
                parked.push(op);
                return false;
            }
        }
        match self.store.integrate(&op.session_id, op.clone()) {
            Ok(Merge::Applied) => {
                self.release_pending(&op.id);
                true
            }
            Ok(Merge::AlreadyPresent) => false,
            Err(CrdtError::UnknownReference(reference)) => {
                debug!(id = %op.id, %reference, "parking operation until its reference arrives");
                self.pending.lock().entry(reference).or_default().push(op);
                false
            }
            Err(CrdtError::UnknownSession(session_id)) => {
                debug!(%session_id, "discarding operation for a session this worker does not hold");
                false
            }
        }
    }

    /// Replay operations that were waiting for `id`, transitively.
    fn release_pending(&self, id: &OpId) {
        let parked = self.pending.lock().remove(id);
        if let Some(ops) = parked {
            for op in ops {
                self.apply_one(op);
            }
        }
    }

    /// One replication cycle: drain the buffer once, then fan the same
    /// batch out to every registered peer concurrently. Each send is
    /// preceded by a liveness probe; unresponsive peers are removed. A slow
    /// peer never stalls the fan-out to the others.
    pub async fn push_cycle(&self, registry: &PeerRegistry) {
        let batch = self.buffer.lock().drain();
        let links = registry.links();
        if links.is_empty() {
            if !batch.is_empty() {
                debug!(count = batch.len(), "no live peers for this cycle's batch");
            }
            return;
        }

        let sends = links.into_iter().map(|link| {
            let batch = batch.clone();
            async move {
                if !link.ping().await {
                    return Some(link.addr().to_string());
                }
                if batch.is_empty() {
                    return None;
                }
                match link.call(&PeerRequest::ApplyOps { ops: batch }).await {
                    Ok(_) => None,
                    Err(error) => {
                        warn!(peer = link.addr(), %error, "batch send failed");
                        Some(link.addr().to_string())
                    }
                }
            }
        });
        for dead in join_all(sends).await.into_iter().flatten() {
            warn!(peer = %dead, "dropping unresponsive peer");
            registry.remove(&dead);
        }
    }

    /// Fetch a session this worker does not hold: query connected peers one
    /// at a time and install the first snapshot offered wholesale. Inbound
    /// operations for the session are parked for the duration and replayed
    /// through the normal merge path afterwards.
    pub async fn fetch_session(
        &self,
        registry: &PeerRegistry,
        session_id: &str,
    ) -> Result<(), ReplicationError> {
        self.gated
            .lock()
            .entry(session_id.to_string())
            .or_default();

        let fetched = self.fetch_from_any_peer(registry, session_id).await;
        if let Some(document) = &fetched {
            self.store.install(session_id, document.clone());
            info!(%session_id, "installed snapshot from peer");
            if let Err(error) = self.persistence.persist(session_id, document).await {
                warn!(%session_id, %error, "snapshot persistence failed");
            }
        }

        let parked = self.gated.lock().remove(session_id).unwrap_or_default();
        for op in parked {
            self.apply_one(op);
        }

        match fetched {
            Some(_) => Ok(()),
            None => Err(ReplicationError::BootstrapExhausted(session_id.to_string())),
        }
    }

    async fn fetch_from_any_peer(
        &self,
        registry: &PeerRegistry,
        session_id: &str,
    ) -> Option<palimpsest_crdt::Document> {
        for link in registry.links() {
            let request = PeerRequest::FetchDocument {
                session_id: session_id.to_string(),
            };
            match link.call(&request).await {
                Ok(PeerResponse::Document { document }) => return Some(document),
                Ok(PeerResponse::UnknownSession { .. }) => {
                    debug!(peer = link.addr(), %session_id, "peer does not hold the session");
                }
                Ok(other) => {
                    debug!(peer = link.addr(), ?other, "unexpected snapshot response");
                }
                Err(error) => {
                    debug!(peer = link.addr(), %error, "snapshot request failed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_crdt::HEAD_ANCHOR;

    fn engine_with_session(session: &str) -> ReplicationEngine {
        let store = Arc::new(DocumentStore::new());
        store.create(session);
        ReplicationEngine::new(store, "1")
    }

    fn op(session: &str, id: &str, prev: &str, client: &str, text: &str) -> Element {
        Element::insert(session, client, OpId::new(id), OpId::new(prev), text)
    }

    #[test]
    fn local_inserts_accumulate_in_the_buffer() {
        let engine = engine_with_session("s");
        let a = engine.local_insert("s", OpId::head(), "a").unwrap();
        engine.local_insert("s", a.id.clone(), "b").unwrap();

        assert_eq!(engine.buffered(), 2);
        assert_eq!(engine.store().text("s").as_deref(), Some("ab"));
    }

    #[test]
    fn remote_merge_is_idempotent() {
        let engine = engine_with_session("s");
        let batch = vec![
            op("s", "12", HEAD_ANCHOR, "2", "a"),
            op("s", "22", "12", "2", "b"),
        ];
        engine.apply_remote(batch.clone());
        engine.apply_remote(batch);

        assert_eq!(engine.store().text("s").as_deref(), Some("ab"));
        assert_eq!(engine.buffered(), 0);
    }

    #[test]
    fn unknown_session_operations_are_discarded() {
        let engine = engine_with_session("s");
        engine.apply_remote(vec![op("other", "12", HEAD_ANCHOR, "2", "a")]);
        assert!(!engine.store().contains("other"));
    }

    #[test]
    fn out_of_order_delivery_converges_through_the_pending_buffer() {
        let engine = engine_with_session("s");
        engine.local_insert("s", OpId::head(), "x").unwrap();

        // Grandchild first, then child, then the parent they hang off.
        engine.apply_remote(vec![op("s", "32", "22", "2", "c")]);
        engine.apply_remote(vec![op("s", "22", "12", "2", "b")]);
        assert_eq!(engine.store().text("s").as_deref(), Some("x"));

        engine.apply_remote(vec![op("s", "12", "11", "2", "a")]);
        assert_eq!(engine.store().text("s").as_deref(), Some("xabc"));
    }

    #[test]
    fn delete_operations_are_refused() {
        let engine = engine_with_session("s");
        let mut tombstone = op("s", "12", HEAD_ANCHOR, "2", "a");
        tombstone.deleted = true;
        engine.apply_remote(vec![tombstone]);
        assert_eq!(engine.store().text("s").as_deref(), Some(""));
    }

    #[test]
    fn gated_sessions_park_inbound_operations_until_released() {
        let engine = engine_with_session("s");
        engine.gated.lock().entry("s".to_string()).or_default();

        engine.apply_remote(vec![op("s", "12", HEAD_ANCHOR, "2", "a")]);
        assert_eq!(engine.store().text("s").as_deref(), Some(""));

        let parked = engine.gated.lock().remove("s").unwrap();
        assert_eq!(parked.len(), 1);
        for waiting in parked {
            engine.apply_one(waiting);
        }
        assert_eq!(engine.store().text("s").as_deref(), Some("a"));
    }

    #[test]
    fn client_edits_enter_the_fan_out_buffer_once_applied() {
        let engine = engine_with_session("s");
        engine.submit_edit(op("s", "19", HEAD_ANCHOR, "9", "a"));
        assert_eq!(engine.buffered(), 1);

        // Duplicates and rejects stay out of the buffer.
        engine.submit_edit(op("s", "19", HEAD_ANCHOR, "9", "a"));
        engine.submit_edit(op("other", "29", HEAD_ANCHOR, "9", "b"));
        assert_eq!(engine.buffered(), 1);
    }

    #[tokio::test]
    async fn bootstrap_with_no_peers_is_exhausted() {
        let engine = engine_with_session("s");
        let registry = PeerRegistry::new();
        let err = engine.fetch_session(&registry, "wanted").await.unwrap_err();
        assert!(matches!(err, ReplicationError::BootstrapExhausted(_)));
        assert!(!engine.store().contains("wanted"));
    }
}
