//! Client-facing WebSocket gateway.
//!
//! Carries JSON-shaped [`GatewayMessage`]s in both directions. The one
//! recognized command is the session-snapshot request; edits arrive as
//! Element-shaped payloads and are fed to the engine's merge entry point.

use crate::worker::Worker;
use futures::{SinkExt, StreamExt};
use palimpsest_crdt::Element;
use palimpsest_wire::{GatewayMessage, CMD_GET_SESSION_CRDT};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Connected clients, keyed by username. A later connection with the same
/// name replaces the older one.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, mpsc::UnboundedSender<GatewayMessage>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, username: &str, sender: mpsc::UnboundedSender<GatewayMessage>) {
        self.clients.write().insert(username.to_string(), sender);
    }

    fn deregister(&self, username: &str) {
        self.clients.write().remove(username);
    }

    /// Deliver a message to one client; a failed delivery deregisters it.
    pub fn send(&self, username: &str, message: GatewayMessage) {
        let sender = self.clients.read().get(username).cloned();
        if let Some(sender) = sender {
            if sender.send(message).is_err() {
                self.deregister(username);
            }
        }
    }
}

pub async fn serve(listener: TcpListener, worker: Worker) {
    loop {
        match listener.accept().await {
            Ok((stream, client_addr)) => {
                debug!(%client_addr, "client connecting");
                tokio::spawn(handle(stream, worker.clone()));
            }
            Err(error) => warn!(%error, "client accept failed"),
        }
    }
}

async fn handle(stream: TcpStream, worker: Worker) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(error) => {
            warn!(%error, "websocket handshake failed");
            return;
        }
    };
    let (mut sink, mut source) = ws.split();
    let (sender, mut outbox) = mpsc::unbounded_channel::<GatewayMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbox.recv().await {
            let Ok(text) = serde_json::to_string(&message) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                return;
            }
        }
    });

    let mut username: Option<String> = None;
    while let Some(incoming) = source.next().await {
        let message = match incoming {
            Ok(Message::Text(text)) => match serde_json::from_str::<GatewayMessage>(&text) {
                Ok(message) => message,
                Err(error) => {
                    debug!(%error, "ignoring malformed client message");
                    continue;
                }
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        if !message.username.is_empty() && username.as_deref() != Some(message.username.as_str()) {
            worker.clients.register(&message.username, sender.clone());
            username = Some(message.username.clone());
            info!(username = %message.username, "client registered");
        }
        handle_message(&worker, message).await;
    }

    if let Some(username) = username {
        worker.clients.deregister(&username);
        info!(%username, "client disconnected");
    }
    writer.abort();
}

/// Answer a snapshot request, or feed an edit into the merge entry point.
async fn handle_message(worker: &Worker, message: GatewayMessage) {
    if message.command == CMD_GET_SESSION_CRDT {
        if !worker.store.contains(&message.session_id) {
            if let Err(error) = worker
                .engine
                .fetch_session(&worker.registry, &message.session_id)
                .await
            {
                warn!(session_id = %message.session_id, %error, "session unavailable");
            }
        }
        let reply = match worker.store.snapshot(&message.session_id) {
            Some(document) => GatewayMessage {
                session_id: message.session_id.clone(),
                username: message.username.clone(),
                command: CMD_GET_SESSION_CRDT.to_string(),
                elements: String::new(),
                payload: serde_json::to_string(&document).unwrap_or_default(),
            },
            None => GatewayMessage {
                command: "Error".to_string(),
                payload: format!("unknown session {}", message.session_id),
                ..message.clone()
            },
        };
        worker.clients.send(&message.username, reply);
    } else if !message.payload.is_empty() {
        match serde_json::from_str::<Element>(&message.payload) {
            Ok(element) => worker.engine.submit_edit(element),
            Err(error) => debug!(%error, "ignoring non-element payload"),
        }
    }
}
