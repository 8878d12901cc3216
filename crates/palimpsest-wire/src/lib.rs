//! Wire contract for the Palimpsest worker mesh.
//!
//! Only the logical message shapes are normative: every transport carries
//! one JSON value per line. Each RPC method gets its own tagged variant,
//! one concrete shape per method.

pub mod coordinator;
pub mod frame;
pub mod gateway;
pub mod peer;

pub use coordinator::{CoordinatorRequest, CoordinatorResponse, WorkerSettings};
pub use frame::{read_frame, write_frame, FrameError};
pub use gateway::{GatewayMessage, CMD_GET_SESSION_CRDT};
pub use peer::{PeerRequest, PeerResponse};
