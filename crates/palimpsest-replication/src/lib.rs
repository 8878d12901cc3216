//! Replication engine and session bootstrap for the Palimpsest worker.
//!
//! Locally buffered edits are fanned out to every live peer on a fixed
//! cadence; inbound batches are merged idempotently through the insert
//! resolver. A worker lacking a session pulls a full snapshot from the
//! first peer able to supply one.

pub mod engine;
pub mod error;
pub mod persist;
pub mod store;

pub use engine::ReplicationEngine;
pub use error::ReplicationError;
pub use persist::{NullPersistence, SnapshotPersistence};
pub use store::DocumentStore;
