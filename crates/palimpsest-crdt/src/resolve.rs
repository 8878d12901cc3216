//! Concurrent-insert resolution.
//!
//! Placement of a new element is a pure function of the anchor's contents at
//! decision time and the new element's identifier and client, so any two
//! replicas that have received the same set of elements link them
//! identically, with no synchronized clocks and no central sequencer.

use crate::document::Document;
use crate::element::{Element, OpId};
use crate::error::CrdtError;

/// Outcome of merging one element into a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Merge {
    /// The element was linked into the document.
    Applied,
    /// The identifier was already present; the document is unchanged.
    AlreadyPresent,
}

impl Document {
    /// Merge one element into the document.
    ///
    /// Four cases, evaluated in order: the first element of an empty
    /// document, a replacement of the current first element (head anchor),
    /// the concurrent-insert walk, and the final splice. Re-merging a known
    /// identifier is a no-op, which is what keeps at-least-once,
    /// out-of-order delivery convergent.
    ///
    /// An element whose reference is neither known nor the head anchor is
    /// rejected and the document is left untouched.
    pub fn integrate(&mut self, mut element: Element) -> Result<Merge, CrdtError> {
        if self.contains(&element.id) {
            return Ok(Merge::AlreadyPresent);
        }
        // Links are derived locally; whatever the sender recorded for its
        // own copy does not transfer.
        element.next_id = None;

        if self.is_empty() {
            self.set_first(element.id.clone());
        } else if element.prev_id.is_head() {
            // Splice in front of the current first element and take over
            // as the new head.
            if let Some(old_first) = self.first_id().cloned() {
                element.next_id = Some(old_first.clone());
                if let Some(first) = self.get_mut(&old_first) {
                    first.prev_id = element.id.clone();
                }
            }
            self.set_first(element.id.clone());
        } else {
            let anchor_id = self.resolve_anchor(&element)?;
            if let Some(anchor) = self.get_mut(&anchor_id) {
                element.next_id = anchor.next_id.take();
                anchor.next_id = Some(element.id.clone());
            }
        }

        self.store(element);
        Ok(Merge::Applied)
    }

    /// Find the true insertion anchor for a concurrent insert.
    ///
    /// Starting from the referenced element, walk forward while the
    /// successor's identifier is numerically greater-or-equal to the new
    /// element's and the successor originates from a different client. A
    /// same-client successor stops the walk immediately, so one client's
    /// operations are never reordered past each other.
    fn resolve_anchor(&self, element: &Element) -> Result<OpId, CrdtError> {
        let mut anchor = self
            .lookup(&element.prev_id)
            .ok_or_else(|| CrdtError::UnknownReference(element.prev_id.clone()))?;
        let incoming = element.id.numeric();

        while let Some(next_id) = anchor.next_id.as_ref() {
            let Some(next) = self.lookup(next_id) else {
                break;
            };
            let outranked = match (next.id.numeric(), incoming) {
                (Some(existing), Some(new)) => existing >= new,
                _ => false,
            };
            if !outranked || next.client_id == element.client_id {
                break;
            }
            anchor = next;
        }
        Ok(anchor.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::HEAD_ANCHOR;

    fn op(id: &str, prev: &str, client: &str, text: &str) -> Element {
        Element::insert("doc", client, OpId::new(id), OpId::new(prev), text)
    }

    #[test]
    fn first_insert_becomes_first_regardless_of_reference() {
        let mut doc = Document::new();
        let merge = doc.integrate(op("11", "999", "1", "a")).unwrap();
        assert_eq!(merge, Merge::Applied);
        assert_eq!(doc.first_id(), Some(&OpId::new("11")));
        assert_eq!(doc.text(), "a");
    }

    #[test]
    fn head_anchor_insert_replaces_the_first_element() {
        let mut doc = Document::new();
        doc.integrate(op("11", HEAD_ANCHOR, "1", "b")).unwrap();
        doc.integrate(op("12", HEAD_ANCHOR, "1", "a")).unwrap();

        assert_eq!(doc.first_id(), Some(&OpId::new("12")));
        let new_first = doc.lookup(&OpId::new("12")).unwrap();
        assert_eq!(new_first.next_id, Some(OpId::new("11")));
        let old_first = doc.lookup(&OpId::new("11")).unwrap();
        assert_eq!(old_first.prev_id, OpId::new("12"));
        assert_eq!(doc.text(), "ab");
    }

    #[test]
    fn unknown_reference_leaves_the_document_unchanged() {
        let mut doc = Document::new();
        doc.integrate(op("11", HEAD_ANCHOR, "1", "a")).unwrap();

        let err = doc.integrate(op("21", "404", "2", "x")).unwrap_err();
        assert_eq!(err, CrdtError::UnknownReference(OpId::new("404")));
        assert_eq!(doc.text(), "a");
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.next_op_number(), 2);
    }

    #[test]
    fn duplicate_merge_is_a_no_op() {
        let mut doc = Document::new();
        doc.integrate(op("11", HEAD_ANCHOR, "1", "a")).unwrap();
        let counter = doc.next_op_number();

        let merge = doc.integrate(op("11", HEAD_ANCHOR, "1", "a")).unwrap();
        assert_eq!(merge, Merge::AlreadyPresent);
        assert_eq!(doc.text(), "a");
        assert_eq!(doc.next_op_number(), counter);
    }

    // The walkthrough from the design discussion: concurrent inserts at the
    // same anchor from distinct clients, higher id landing closer to it.
    #[test]
    fn concurrent_sibling_with_higher_id_sits_closer_to_the_anchor() {
        let mut doc = Document::new();
        doc.integrate(op("11", HEAD_ANCHOR, "1", "a")).unwrap();
        assert_eq!(doc.first_id(), Some(&OpId::new("11")));
        doc.integrate(op("12", "11", "1", "b")).unwrap();
        assert_eq!(doc.text(), "ab");
        doc.integrate(op("21", "11", "2", "c")).unwrap();
        assert_eq!(doc.text(), "acb");
    }

    #[test]
    fn concurrent_inserts_converge_in_either_application_order() {
        let base = {
            let mut doc = Document::new();
            doc.integrate(op("11", HEAD_ANCHOR, "1", "a")).unwrap();
            doc
        };
        let ours = op("12", "11", "1", "b");
        let theirs = op("21", "11", "2", "c");

        let mut forward = base.clone();
        forward.integrate(ours.clone()).unwrap();
        forward.integrate(theirs.clone()).unwrap();

        let mut backward = base;
        backward.integrate(theirs).unwrap();
        backward.integrate(ours).unwrap();

        assert_eq!(forward.text(), backward.text());
        assert_eq!(forward.text(), "acb");

        // Link structure agrees, not just the rendered text.
        for id in ["11", "12", "21"] {
            let id = OpId::new(id);
            assert_eq!(
                forward.lookup(&id).unwrap().next_id,
                backward.lookup(&id).unwrap().next_id
            );
        }
    }

    #[test]
    fn same_client_operations_are_never_reordered_past_each_other() {
        // A same-client successor with a larger id stops the walk at once.
        let mut doc = Document::new();
        doc.integrate(op("11", HEAD_ANCHOR, "1", "a")).unwrap();
        doc.integrate(op("31", "11", "1", "x")).unwrap();
        doc.integrate(op("12", "11", "1", "y")).unwrap();
        // "12" would be outranked by "31" numerically, but both belong to
        // client 1, so it refuses to move past it.
        assert_eq!(doc.text(), "ayx");
    }

    #[test]
    fn walk_passes_multiple_outranking_siblings() {
        let mut doc = Document::new();
        doc.integrate(op("11", HEAD_ANCHOR, "1", "a")).unwrap();
        doc.integrate(op("31", "11", "3", "c")).unwrap();
        doc.integrate(op("22", "11", "2", "b")).unwrap();
        assert_eq!(doc.text(), "acb");

        // A later, lower-id sibling from yet another client walks past both.
        doc.integrate(op("14", "11", "4", "d")).unwrap();
        assert_eq!(doc.text(), "acbd");
    }

    #[test]
    fn remote_first_insert_into_fresh_replica_ignores_stale_links() {
        // A sender-side copy may carry next links from its own structure;
        // they must not leak into a replica that lacks those elements.
        let mut stale = op("21", "11", "2", "z");
        stale.next_id = Some(OpId::new("77"));

        let mut doc = Document::new();
        doc.integrate(stale).unwrap();
        assert_eq!(doc.text(), "z");
        assert_eq!(doc.lookup(&OpId::new("21")).unwrap().next_id, None);
    }
}
