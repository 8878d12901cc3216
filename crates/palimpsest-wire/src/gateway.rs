//! Messages crossing the browser/client boundary.

use serde::{Deserialize, Serialize};

/// Command requesting the serialized document for a session.
pub const CMD_GET_SESSION_CRDT: &str = "GetSessCRDT";

/// JSON shape carried over a client connection, in both directions.
///
/// Clients identify themselves through `username`; a later connection with
/// the same name replaces the older one. Edits arrive as Element-shaped
/// JSON in `payload`; snapshot replies carry the serialized document there.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayMessage {
    pub session_id: String,
    pub username: String,
    pub command: String,
    pub elements: String,
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_empty() {
        let message: GatewayMessage =
            serde_json::from_str(r#"{"username":"ada","command":"GetSessCRDT"}"#).unwrap();
        assert_eq!(message.username, "ada");
        assert_eq!(message.command, CMD_GET_SESSION_CRDT);
        assert_eq!(message.session_id, "");
        assert_eq!(message.payload, "");
    }
}
