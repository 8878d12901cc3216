//! Error types for the document model.

use crate::element::OpId;
use thiserror::Error;

/// Errors surfaced by document operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrdtError {
    /// An insert named a reference element the document has never seen.
    #[error("unknown reference element: {0}")]
    UnknownReference(OpId),

    /// An operation addressed a session this worker does not hold.
    #[error("unknown session: {0}")]
    UnknownSession(String),
}
