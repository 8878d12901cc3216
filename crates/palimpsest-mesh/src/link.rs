//! An open connection to one peer worker.

use crate::conn::Framed;
use crate::error::MeshError;
use palimpsest_wire::{PeerRequest, PeerResponse};
use tokio::sync::Mutex;

/// Outbound link to a peer, keyed in the registry by its dial address.
pub struct PeerLink {
    addr: String,
    framed: Mutex<Framed>,
}

impl PeerLink {
    /// Dial a peer's RPC address.
    pub async fn connect(addr: impl Into<String>) -> Result<Self, MeshError> {
        let addr = addr.into();
        let framed = Framed::dial(&addr).await?;
        Ok(Self {
            addr,
            framed: Mutex::new(framed),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// One request/response exchange with the peer.
    pub async fn call(&self, request: &PeerRequest) -> Result<PeerResponse, MeshError> {
        let mut framed = self.framed.lock().await;
        framed.call(request).await
    }

    /// Liveness probe: a trivial request/acknowledge exchange. Any error
    /// is treated as peer-down.
    pub async fn ping(&self) -> bool {
        matches!(self.call(&PeerRequest::Ping).await, Ok(PeerResponse::Pong))
    }
}
