//! Error types for mesh operations.

use palimpsest_wire::FrameError;
use thiserror::Error;

/// Errors surfaced by peer and coordinator calls.
///
/// Network-level failures prune membership locally and are never fatal to
/// the worker process.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The remote side answered with a variant the method does not expect.
    #[error("unexpected response to {method}")]
    UnexpectedResponse { method: &'static str },
}
