//! Peer-facing RPC server.

use crate::worker::Worker;
use palimpsest_wire::{read_frame, write_frame, FrameError, PeerRequest, PeerResponse};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

pub async fn serve(listener: TcpListener, worker: Worker) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                debug!(%peer_addr, "peer connected");
                tokio::spawn(handle(stream, worker.clone()));
            }
            Err(error) => warn!(%error, "peer accept failed"),
        }
    }
}

async fn handle(stream: TcpStream, worker: Worker) {
    if let Err(error) = stream.set_nodelay(true) {
        debug!(%error, "could not disable nagle on peer connection");
    }
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    loop {
        let request = match read_frame::<_, PeerRequest>(&mut reader).await {
            Ok(request) => request,
            Err(FrameError::ConnectionClosed) => return,
            Err(error) => {
                debug!(%error, "dropping peer connection");
                return;
            }
        };
        let response = dispatch(&worker, request).await;
        if write_frame(&mut write_half, &response).await.is_err() {
            return;
        }
    }
}

async fn dispatch(worker: &Worker, request: PeerRequest) -> PeerResponse {
    match request {
        PeerRequest::Ping => PeerResponse::Pong,
        PeerRequest::ApplyOps { ops } => {
            worker.engine.apply_remote(ops);
            PeerResponse::OpsApplied
        }
        PeerRequest::BidirectionalSetup { callback_addr } => {
            // A failed dial-back already scrubbed the registry entry; the
            // dialer is acknowledged either way.
            let _ = worker.mesh.accept_callback(&callback_addr).await;
            PeerResponse::SetupComplete
        }
        PeerRequest::FetchDocument { session_id } => match worker.store.snapshot(&session_id) {
            Some(document) => PeerResponse::Document { document },
            None => PeerResponse::UnknownSession { session_id },
        },
    }
}
