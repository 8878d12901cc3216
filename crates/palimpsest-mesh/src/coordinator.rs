//! Client side of the coordinator RPC contract.

use crate::conn::Framed;
use crate::error::MeshError;
use palimpsest_wire::{CoordinatorRequest, CoordinatorResponse, WorkerSettings};
use tokio::sync::Mutex;

/// Persistent connection to the coordinator/load-balancer.
pub struct CoordinatorClient {
    addr: String,
    framed: Mutex<Framed>,
}

impl CoordinatorClient {
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

    async fn call(&self, request: &CoordinatorRequest) -> Result<CoordinatorResponse, MeshError> {
        let mut framed = self.framed.lock().await;
        framed.call(request).await
    }

    /// Announce this worker; the coordinator assigns its identifier and
    /// operating settings.
    pub async fn register(
        &self,
        rpc_addr: &str,
        gateway_addr: &str,
    ) -> Result<WorkerSettings, MeshError> {
        let response = self
            .call(&CoordinatorRequest::Register {
                rpc_addr: rpc_addr.to_string(),
                gateway_addr: gateway_addr.to_string(),
            })
            .await?;
        match response {
            CoordinatorResponse::Registered { settings } => Ok(settings),
            _ => Err(MeshError::UnexpectedResponse { method: "register" }),
        }
    }

    pub async fn heartbeat(&self, worker_id: u64) -> Result<(), MeshError> {
        match self.call(&CoordinatorRequest::Heartbeat { worker_id }).await? {
            CoordinatorResponse::HeartbeatAck => Ok(()),
            _ => Err(MeshError::UnexpectedResponse { method: "heartbeat" }),
        }
    }

    /// Peer addresses to top the mesh back up with.
    pub async fn get_nodes(&self, worker_id: u64) -> Result<Vec<String>, MeshError> {
        match self.call(&CoordinatorRequest::GetNodes { worker_id }).await? {
            CoordinatorResponse::Nodes { addrs } => Ok(addrs),
            _ => Err(MeshError::UnexpectedResponse { method: "get_nodes" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_wire::{read_frame, write_frame};
    use tokio::io::BufReader;
    use tokio::net::TcpListener;

    /// A coordinator stub that registers one worker and hands out a fixed
    /// peer list.
    async fn coordinator_stub() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            while let Ok(request) = read_frame::<_, CoordinatorRequest>(&mut reader).await {
                let response = match request {
                    CoordinatorRequest::Register { .. } => CoordinatorResponse::Registered {
                        settings: WorkerSettings {
                            worker_id: 7,
                            heartbeat_interval_ms: 1000,
                            min_peer_count: 2,
                        },
                    },
                    CoordinatorRequest::Heartbeat { .. } => CoordinatorResponse::HeartbeatAck,
                    CoordinatorRequest::GetNodes { .. } => CoordinatorResponse::Nodes {
                        addrs: vec!["127.0.0.1:9".to_string()],
                    },
                };
                if write_frame(&mut write_half, &response).await.is_err() {
                    break;
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn register_heartbeat_and_node_lookup() {
        let addr = coordinator_stub().await;
        let client = CoordinatorClient::connect(addr).await.unwrap();

        let settings = client.register("127.0.0.1:1", "127.0.0.1:2").await.unwrap();
        assert_eq!(settings.worker_id, 7);
        assert_eq!(settings.min_peer_count, 2);

        client.heartbeat(settings.worker_id).await.unwrap();

        let nodes = client.get_nodes(settings.worker_id).await.unwrap();
        assert_eq!(nodes, vec!["127.0.0.1:9".to_string()]);
    }
}
