//! Coordinator RPC shapes, consumed by workers.

use serde::{Deserialize, Serialize};

/// Settings a worker adopts when it registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSettings {
    /// Identifier assigned to this worker; also its client id when minting
    /// operation identifiers.
    pub worker_id: u64,
    /// How often to send heartbeats.
    pub heartbeat_interval_ms: u64,
    /// Minimum number of live peer connections to maintain.
    pub min_peer_count: usize,
}

/// Requests a worker sends to the coordinator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CoordinatorRequest {
    /// Announce a new worker and its listener addresses.
    Register {
        rpc_addr: String,
        gateway_addr: String,
    },
    Heartbeat { worker_id: u64 },
    /// Ask for peer addresses to top the mesh back up.
    GetNodes { worker_id: u64 },
}

/// Coordinator replies, one shape per method.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CoordinatorResponse {
    Registered { settings: WorkerSettings },
    HeartbeatAck,
    Nodes { addrs: Vec<String> },
}
