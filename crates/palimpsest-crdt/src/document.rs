//! The per-session element graph and its ordered walk.

use crate::element::{Element, OpId};
use crate::error::CrdtError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One replica's copy of a shared document.
///
/// Elements live in an unordered map; the rendered order is recovered by
/// following `next_id` links from `first_id`. The operation counter advances
/// after every applied element, local or remote, and is concatenated with
/// the client identifier to mint new operation ids.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    elements: HashMap<OpId, Element>,
    first_id: Option<OpId>,
    next_op_number: u64,
}

impl Document {
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
            first_id: None,
            next_op_number: 1,
        }
    }

    pub fn lookup(&self, id: &OpId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn contains(&self, id: &OpId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements held, including any tombstones.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn first_id(&self) -> Option<&OpId> {
        self.first_id.as_ref()
    }

    pub fn next_op_number(&self) -> u64 {
        self.next_op_number
    }

    /// Lazy ordered walk from the first element to the last. Restartable;
    /// used to materialize the rendered text and to compare replicas.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            document: self,
            cursor: self.first_id.as_ref(),
            remaining: self.elements.len(),
        }
    }

    /// The rendered text: payloads of the ordered walk, concatenated.
    pub fn text(&self) -> String {
        self.walk().map(|element| element.text.as_str()).collect()
    }

    /// Insert locally authored text to the right of `reference`, minting a
    /// fresh operation identifier from the document counter.
    ///
    /// The reference must already exist or name the head anchor; otherwise
    /// the insert is rejected and the document is left untouched.
    pub fn insert_after(
        &mut self,
        reference: OpId,
        session_id: &str,
        client_id: &str,
        text: impl Into<String>,
    ) -> Result<Element, CrdtError> {
        if !reference.is_head() && !self.contains(&reference) {
            return Err(CrdtError::UnknownReference(reference));
        }
        let id = OpId::mint(self.next_op_number, client_id);
        let element = Element::insert(session_id, client_id, id.clone(), reference, text);
        self.integrate(element.clone())?;
        Ok(self.elements.get(&id).cloned().unwrap_or(element))
    }

    pub(crate) fn get_mut(&mut self, id: &OpId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub(crate) fn set_first(&mut self, id: OpId) {
        self.first_id = Some(id);
    }

    /// Record an applied element and advance the operation counter.
    pub(crate) fn store(&mut self, element: Element) {
        self.elements.insert(element.id.clone(), element);
        self.next_op_number += 1;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over elements in rendered order.
pub struct Walk<'a> {
    document: &'a Document,
    cursor: Option<&'a OpId>,
    remaining: usize,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let element = self.document.lookup(self.cursor?)?;
        self.remaining -= 1;
        self.cursor = element.next_id.as_ref();
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_is_empty() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.first_id(), None);
        assert_eq!(doc.next_op_number(), 1);
        assert_eq!(doc.text(), "");
    }

    #[test]
    fn insert_after_chains_text() {
        let mut doc = Document::new();
        let a = doc.insert_after(OpId::head(), "s", "1", "a").unwrap();
        let b = doc.insert_after(a.id.clone(), "s", "1", "b").unwrap();
        doc.insert_after(b.id.clone(), "s", "1", "c").unwrap();
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn insert_after_advances_the_counter() {
        let mut doc = Document::new();
        let a = doc.insert_after(OpId::head(), "s", "4", "a").unwrap();
        assert_eq!(a.id.as_str(), "14");
        let b = doc.insert_after(a.id.clone(), "s", "4", "b").unwrap();
        assert_eq!(b.id.as_str(), "24");
        assert_eq!(doc.next_op_number(), 3);
    }

    #[test]
    fn insert_after_rejects_a_missing_reference() {
        let mut doc = Document::new();
        let err = doc
            .insert_after(OpId::new("404"), "s", "1", "a")
            .unwrap_err();
        assert_eq!(err, CrdtError::UnknownReference(OpId::new("404")));
        assert!(doc.is_empty());
    }

    #[test]
    fn walk_is_restartable() {
        let mut doc = Document::new();
        let a = doc.insert_after(OpId::head(), "s", "1", "x").unwrap();
        doc.insert_after(a.id.clone(), "s", "1", "y").unwrap();
        assert_eq!(doc.walk().count(), 2);
        assert_eq!(doc.walk().count(), 2);
    }

    #[test]
    fn snapshot_round_trips_through_serde() {
        let mut doc = Document::new();
        let a = doc.insert_after(OpId::head(), "s", "1", "a").unwrap();
        doc.insert_after(a.id.clone(), "s", "1", "b").unwrap();

        let json = serde_json::to_string(&doc).unwrap();
        let restored: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.text(), "ab");
        assert_eq!(restored.next_op_number(), doc.next_op_number());
        assert_eq!(restored.first_id(), doc.first_id());
    }
}
