//! Worker assembly: registration, shared state, and the periodic loops.

use crate::gateway::ClientRegistry;
use crate::{gateway, rpc};
use anyhow::Context;
use palimpsest_mesh::{CoordinatorClient, Mesh, PeerRegistry};
use palimpsest_replication::{DocumentStore, ReplicationEngine};
use palimpsest_wire::WorkerSettings;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Heartbeats go out slightly ahead of the coordinator's interval.
const HEARTBEAT_SEND_BUFFER_MS: u64 = 500;
/// Cadence of the replication push loop.
const PUSH_INTERVAL: Duration = Duration::from_secs(10);
/// Cadence of the membership refresh loop.
const REFRESH_INTERVAL: Duration = Duration::from_secs(30);
/// Length of generated session identifiers.
const SESSION_ID_LEN: usize = 5;

/// One worker's shared state. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct Worker {
    pub settings: WorkerSettings,
    pub rpc_addr: String,
    pub gateway_addr: String,
    pub store: Arc<DocumentStore>,
    pub engine: Arc<ReplicationEngine>,
    pub registry: Arc<PeerRegistry>,
    pub mesh: Arc<Mesh>,
    pub coordinator: Arc<CoordinatorClient>,
    pub clients: Arc<ClientRegistry>,
}

impl Worker {
    /// Bind listeners, register with the coordinator, start serving, and
    /// perform the initial mesh fill.
    pub async fn bootstrap(coordinator_addr: &str, bind_ip: &str) -> anyhow::Result<Worker> {
        let rpc_listener = TcpListener::bind((bind_ip, 0))
            .await
            .context("binding peer RPC listener")?;
        let rpc_addr = rpc_listener.local_addr()?.to_string();
        let gateway_listener = TcpListener::bind((bind_ip, 0))
            .await
            .context("binding client gateway listener")?;
        let gateway_addr = gateway_listener.local_addr()?.to_string();

        let coordinator = Arc::new(
            CoordinatorClient::connect(coordinator_addr)
                .await
                .context("connecting to coordinator")?,
        );
        let settings = coordinator.register(&rpc_addr, &gateway_addr).await?;
        info!(
            worker_id = settings.worker_id,
            %rpc_addr,
            %gateway_addr,
            "registered with coordinator"
        );

        let store = Arc::new(DocumentStore::new());
        let engine = Arc::new(ReplicationEngine::new(
            store.clone(),
            settings.worker_id.to_string(),
        ));
        let registry = Arc::new(PeerRegistry::new());
        let mesh = Arc::new(Mesh::new(
            registry.clone(),
            coordinator.clone(),
            rpc_addr.clone(),
            settings.worker_id,
            settings.min_peer_count,
        ));

        let worker = Worker {
            settings,
            rpc_addr,
            gateway_addr,
            store,
            engine,
            registry,
            mesh,
            coordinator,
            clients: Arc::new(ClientRegistry::new()),
        };

        tokio::spawn(rpc::serve(rpc_listener, worker.clone()));
        tokio::spawn(gateway::serve(gateway_listener, worker.clone()));

        if let Err(error) = worker.mesh.refresh().await {
            warn!(%error, "initial mesh fill failed");
        }
        Ok(worker)
    }

    /// Spawn the heartbeat, replication-push, and membership-refresh loops.
    pub fn spawn_loops(&self) {
        tokio::spawn(heartbeat_loop(self.clone()));
        tokio::spawn(push_loop(self.clone()));
        tokio::spawn(refresh_loop(self.clone()));
    }

    /// Open a fresh, empty session under a generated identifier.
    pub fn new_session(&self) -> String {
        let session_id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        self.store.create(&session_id);
        session_id
    }
}

async fn heartbeat_loop(worker: Worker) {
    let period = worker
        .settings
        .heartbeat_interval_ms
        .saturating_sub(HEARTBEAT_SEND_BUFFER_MS)
        .max(1);
    let mut ticker = tokio::time::interval(Duration::from_millis(period));
    loop {
        ticker.tick().await;
        if let Err(error) = worker.coordinator.heartbeat(worker.settings.worker_id).await {
            warn!(%error, "heartbeat failed");
        }
    }
}

async fn push_loop(worker: Worker) {
    let mut ticker = tokio::time::interval(PUSH_INTERVAL);
    loop {
        ticker.tick().await;
        worker.engine.push_cycle(&worker.registry).await;
    }
}

async fn refresh_loop(worker: Worker) {
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(error) = worker.mesh.refresh().await {
            warn!(%error, "membership refresh failed");
        }
    }
}
