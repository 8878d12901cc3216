//! Worker-to-worker RPC shapes.

use palimpsest_crdt::{Document, Element};
use serde::{Deserialize, Serialize};

/// Requests a worker accepts from other workers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PeerRequest {
    /// Liveness probe. Any transport error is treated as peer-down.
    Ping,
    /// A batch of operations, possibly spanning several sessions.
    ApplyOps { ops: Vec<Element> },
    /// The dialing worker asks us to open a connection back to it, so both
    /// sides end up with a usable outbound link.
    BidirectionalSetup { callback_addr: String },
    /// Full snapshot request for one session.
    FetchDocument { session_id: String },
}

/// Responses to [`PeerRequest`], one shape per method.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PeerResponse {
    Pong,
    OpsApplied,
    SetupComplete,
    Document { document: Document },
    UnknownSession { session_id: String },
}
