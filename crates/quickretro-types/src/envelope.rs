use serde::{Deserialize, Serialize};

/// The frame exchanged over the board socket and over the bridge.
///
/// `grp`, `by` and `xid` may be present on inbound frames but are never
/// trusted: the connection stamps them from its own identity before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub typ: String,
    #[serde(rename = "grp", default)]
    pub board_id: String,
    #[serde(default)]
    pub by: String,
    #[serde(default)]
    pub xid: String,
    #[serde(rename = "pyl", default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Overwrite the identity fields with the values of the owning connection.
    pub fn stamp(&mut self, board_id: &str, user_id: &str, xid: &str) {
        self.board_id = board_id.to_string();
        self.by = user_id.to_string();
        self.xid = xid.to_string();
    }

    /// Envelope for the disconnect notice. Never decoded from the wire.
    pub fn closing(board_id: &str, user_id: &str, xid: &str) -> Self {
        Self {
            typ: crate::events::CLOSING.to_string(),
            board_id: board_id.to_string(),
            by: user_id.to_string(),
            xid: xid.to_string(),
            payload: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_replaces_client_supplied_identity() {
        let mut env: Envelope = serde_json::from_str(
            r#"{"typ":"mask","grp":"other-board","by":"mallory","xid":"9","pyl":{"mask":true}}"#,
        )
        .unwrap();

        env.stamp("b1", "u1", "1");

        assert_eq!(env.board_id, "b1");
        assert_eq!(env.by, "u1");
        assert_eq!(env.xid, "1");
        assert_eq!(env.payload["mask"], true);
    }

    #[test]
    fn identity_fields_are_optional_on_the_wire() {
        let env: Envelope = serde_json::from_str(r#"{"typ":"t"}"#).unwrap();
        assert_eq!(env.typ, "t");
        assert!(env.board_id.is_empty());
        assert!(env.payload.is_null());
    }
}
