//! The membership set: peer address to open connection handle.

use crate::link::PeerLink;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Lock-guarded registry of live peer links.
///
/// Mutated from several concurrent activities (replication push, membership
/// refresh, bidirectional setup), so access goes through these operations
/// rather than the raw map.
#[derive(Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<String, Arc<PeerLink>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, link: Arc<PeerLink>) {
        self.peers.write().insert(link.addr().to_string(), link);
    }

    pub fn remove(&self, addr: &str) -> Option<Arc<PeerLink>> {
        self.peers.write().remove(addr)
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.peers.read().contains_key(addr)
    }

    pub fn get(&self, addr: &str) -> Option<Arc<PeerLink>> {
        self.peers.read().get(addr).cloned()
    }

    /// Snapshot of the current links, for iteration outside the lock.
    pub fn links(&self) -> Vec<Arc<PeerLink>> {
        self.peers.read().values().cloned().collect()
    }

    pub fn addrs(&self) -> Vec<String> {
        self.peers.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}
