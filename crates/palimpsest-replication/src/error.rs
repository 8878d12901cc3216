//! Error types for replication.

use thiserror::Error;

/// Errors surfaced to callers of the replication engine.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// No connected peer could supply a snapshot for the session. The
    /// caller decides whether to retry; there is no built-in retry loop.
    #[error("no peer could supply session {0}")]
    BootstrapExhausted(String),
}
