//! Locally originated edits awaiting replication.

use crate::element::Element;

/// Elements produced by the local insert path since the last flush.
///
/// Append-only; the replication engine drains it exactly once per push
/// cycle and fans the same batch out to every peer. It only ever holds
/// locally originated operations, so no deduplication is needed here.
#[derive(Debug, Default)]
pub struct EditBuffer {
    ops: Vec<Element>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: Element) {
        self.ops.push(element);
    }

    /// Take everything buffered so far, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<Element> {
        std::mem::take(&mut self.ops)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
