//! Operation identifiers and the atomic edit unit.

use serde::{Deserialize, Serialize};

/// Reserved anchor naming the slot before the first element of a document.
/// It is never stored in a document; an insert that references it asks to
/// become (or be ordered relative to) the first element.
pub const HEAD_ANCHOR: &str = "12345";

/// Unique identifier for one operation within a document.
///
/// Minted by concatenating the document's operation counter with the
/// originating client's identifier, so `counter 7` on worker `3` yields
/// `"73"`. Values are unique per (counter, client) pair and admit a numeric
/// total order used as the tie-break for concurrent inserts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(String);

impl OpId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint the identifier for the next operation of `client_id`.
    pub fn mint(counter: u64, client_id: &str) -> Self {
        Self(format!("{counter}{client_id}"))
    }

    /// The reserved head anchor.
    pub fn head() -> Self {
        Self(HEAD_ANCHOR.to_string())
    }

    pub fn is_head(&self) -> bool {
        self.0 == HEAD_ANCHOR
    }

    /// Numeric value used to order concurrent inserts. Identifiers are not
    /// zero-padded, so the comparison must be numeric, never lexicographic.
    pub fn numeric(&self) -> Option<u128> {
        self.0.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One atomic edit: a character (or short run) linked into a document.
///
/// Elements are immutable once linked, except for `prev_id`/`next_id`,
/// which only the insert resolver touches when splicing in new neighbors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// The document this edit belongs to.
    pub session_id: String,
    /// The worker or user that originated the edit.
    pub client_id: String,
    /// Operation identifier, unique within the document.
    pub id: OpId,
    /// The reference element this insert was positioned against.
    pub prev_id: OpId,
    /// Link to the following element; `None` means currently last.
    #[serde(default)]
    pub next_id: Option<OpId>,
    /// Tombstone flag. Declared for the delete operation kind, which has
    /// no resolution rule yet; never set by the insert path.
    #[serde(default)]
    pub deleted: bool,
    /// Payload text.
    pub text: String,
}

impl Element {
    /// A fresh, unlinked insert.
    pub fn insert(
        session_id: impl Into<String>,
        client_id: impl Into<String>,
        id: OpId,
        prev_id: OpId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            client_id: client_id.into(),
            id,
            prev_id,
            next_id: None,
            deleted: false,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_append_the_client() {
        assert_eq!(OpId::mint(1, "1").as_str(), "11");
        assert_eq!(OpId::mint(12, "3").as_str(), "123");
    }

    #[test]
    fn ordering_is_numeric_not_lexicographic() {
        // "9" < "12" as strings would sort the other way around.
        let short = OpId::new("9");
        let long = OpId::new("12");
        assert!(long.numeric() > short.numeric());
    }

    #[test]
    fn head_anchor_is_recognized() {
        assert!(OpId::head().is_head());
        assert!(!OpId::new("11").is_head());
    }

    #[test]
    fn non_numeric_ids_have_no_numeric_value() {
        assert_eq!(OpId::new("abc").numeric(), None);
    }

    #[test]
    fn element_serializes_with_camel_case_fields() {
        let element = Element::insert("sess", "1", OpId::new("11"), OpId::head(), "a");
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["sessionId"], "sess");
        assert_eq!(json["prevId"], HEAD_ANCHOR);
        assert_eq!(json["deleted"], false);
    }
}
