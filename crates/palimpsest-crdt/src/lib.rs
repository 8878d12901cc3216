//! Linked-list CRDT document model for collaborative text editing.
//!
//! A document is a map of immutable elements threaded into a singly walked,
//! doubly referenced chain. Concurrent inserts that target the same anchor
//! are ordered by a deterministic walk over numeric operation identifiers,
//! so every replica that has received the same set of elements renders the
//! same text, regardless of delivery order or duplication.
//!
//! Modules:
//!
//! - [`element`] - operation identifiers and the atomic edit unit
//! - [`document`] - the per-session element graph and its ordered walk
//! - [`resolve`] - the concurrent-insert resolution algorithm
//! - [`buffer`] - locally originated edits awaiting replication

pub mod buffer;
pub mod document;
pub mod element;
pub mod error;
pub mod resolve;

pub use buffer::EditBuffer;
pub use document::{Document, Walk};
pub use element::{Element, OpId, HEAD_ANCHOR};
pub use error::CrdtError;
pub use resolve::Merge;
