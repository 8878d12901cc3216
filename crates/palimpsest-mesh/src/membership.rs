//! Membership maintenance: liveness sweeps, coordinator top-up, and
//! bidirectional link establishment.

use crate::coordinator::CoordinatorClient;
use crate::error::MeshError;
use crate::link::PeerLink;
use crate::registry::PeerRegistry;
use futures::future::join_all;
use palimpsest_wire::PeerRequest;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives the peer registry toward a healthy mesh.
pub struct Mesh {
    registry: Arc<PeerRegistry>,
    coordinator: Arc<CoordinatorClient>,
    /// Our own RPC address, offered to peers for the dial-back.
    local_rpc_addr: String,
    worker_id: u64,
    min_peers: usize,
}

impl Mesh {
    pub fn new(
        registry: Arc<PeerRegistry>,
        coordinator: Arc<CoordinatorClient>,
        local_rpc_addr: impl Into<String>,
        worker_id: u64,
        min_peers: usize,
    ) -> Self {
        Self {
            registry,
            coordinator,
            local_rpc_addr: local_rpc_addr.into(),
            worker_id,
            min_peers,
        }
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// One maintenance pass: probe every known peer concurrently, drop the
    /// ones that fail to answer, and if the live count has fallen below the
    /// minimum, ask the coordinator for more addresses and dial them.
    pub async fn refresh(&self) -> Result<(), MeshError> {
        let links = self.registry.links();
        let probes = links.iter().map(|link| async move {
            let alive = link.ping().await;
            (link.addr().to_string(), alive)
        });
        for (addr, alive) in join_all(probes).await {
            if !alive {
                warn!(peer = %addr, "dropping unresponsive peer");
                self.registry.remove(&addr);
            }
        }

        if self.registry.len() >= self.min_peers {
            return Ok(());
        }

        let addrs = self.coordinator.get_nodes(self.worker_id).await?;
        debug!(count = addrs.len(), "coordinator returned peer addresses");
        for addr in addrs {
            if addr == self.local_rpc_addr || self.registry.contains(&addr) {
                continue;
            }
            if let Err(error) = self.connect_to(&addr).await {
                debug!(peer = %addr, %error, "could not connect to peer");
            }
        }
        Ok(())
    }

    /// Dial a candidate peer, register the link, and ask the remote side to
    /// open a connection back so the edge is usable in both directions.
    pub async fn connect_to(&self, addr: &str) -> Result<(), MeshError> {
        let link = Arc::new(PeerLink::connect(addr).await?);
        self.registry.insert(link.clone());
        info!(peer = %addr, "connected to peer");

        if let Err(error) = link
            .call(&PeerRequest::BidirectionalSetup {
                callback_addr: self.local_rpc_addr.clone(),
            })
            .await
        {
            warn!(peer = %addr, %error, "bidirectional setup not acknowledged");
        }
        Ok(())
    }

    /// Handle a bidirectional-setup offer: dial the address back and
    /// register it. On failure the address must not linger half-registered.
    pub async fn accept_callback(&self, addr: &str) -> Result<(), MeshError> {
        match PeerLink::connect(addr).await {
            Ok(link) => {
                self.registry.insert(Arc::new(link));
                info!(peer = %addr, "registered dial-back link");
                Ok(())
            }
            Err(error) => {
                self.registry.remove(addr);
                warn!(peer = %addr, %error, "dial-back failed");
                Err(error)
            }
        }
    }
}
