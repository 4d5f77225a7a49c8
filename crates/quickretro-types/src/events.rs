use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::BoardColumn;

pub const REGISTER: &str = "reg";
pub const MASK: &str = "mask";
pub const LOCK: &str = "lock";
pub const MESSAGE: &str = "msg";
pub const LIKE: &str = "like";
pub const DELETE: &str = "del";
pub const DELETE_ALL: &str = "delall";
pub const CATEGORY_CHANGE: &str = "catchng";
pub const TIMER: &str = "timer";
pub const COLUMNS_CHANGE: &str = "colreset";
pub const TYPING: &str = "t";
pub const CLOSING: &str = "closing";

/// Tags a client may send. `closing` is synthesized by the hub only.
pub const INBOUND_TAGS: &[&str] = &[
    REGISTER,
    MASK,
    LOCK,
    MESSAGE,
    LIKE,
    DELETE,
    DELETE_ALL,
    CATEGORY_CHANGE,
    TIMER,
    COLUMNS_CHANGE,
    TYPING,
];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown event type: {0}")]
    UnknownType(String),
    #[error("invalid {typ} payload: {source}")]
    Payload {
        typ: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegisterPayload {
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MaskPayload {
    pub mask: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LockPayload {
    pub lock: bool,
}

/// Create or edit a message or comment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MessagePayload {
    pub id: String,
    pub nickname: String,
    #[serde(rename = "msg")]
    pub content: String,
    #[serde(rename = "cat")]
    pub category: String,
    #[serde(rename = "pid")]
    pub parent_id: String,
    #[serde(rename = "anon")]
    pub anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikePayload {
    pub msg_id: String,
    pub like: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeletePayload {
    pub msg_id: String,
    pub comment_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryChangePayload {
    pub msg_id: String,
    pub old_category: String,
    pub new_category: String,
    pub comment_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerPayload {
    pub expiry_duration_in_seconds: u16,
    pub stop: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnsChangePayload {
    pub columns: Vec<BoardColumn>,
}

/// Every event a board understands, one variant per wire tag.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    Register(RegisterPayload),
    Mask(MaskPayload),
    Lock(LockPayload),
    Message(MessagePayload),
    Like(LikePayload),
    Delete(DeletePayload),
    DeleteAll,
    CategoryChange(CategoryChangePayload),
    Timer(TimerPayload),
    ColumnsChange(ColumnsChangePayload),
    Typing,
    Closing,
}

impl BoardEvent {
    /// Decode a frame received from a client socket.
    pub fn decode_inbound(typ: &str, payload: &serde_json::Value) -> Result<Self, DecodeError> {
        if typ == CLOSING {
            return Err(DecodeError::UnknownType(typ.to_string()));
        }
        Self::decode(typ, payload)
    }

    /// Decode any known tag, including the synthesized `closing`.
    pub fn decode(typ: &str, payload: &serde_json::Value) -> Result<Self, DecodeError> {
        let event = match typ {
            REGISTER => Self::Register(payload_of(typ, payload)?),
            MASK => Self::Mask(payload_of(typ, payload)?),
            LOCK => Self::Lock(payload_of(typ, payload)?),
            MESSAGE => Self::Message(payload_of(typ, payload)?),
            LIKE => Self::Like(payload_of(typ, payload)?),
            DELETE => Self::Delete(payload_of(typ, payload)?),
            DELETE_ALL => Self::DeleteAll,
            CATEGORY_CHANGE => Self::CategoryChange(payload_of(typ, payload)?),
            TIMER => Self::Timer(payload_of(typ, payload)?),
            COLUMNS_CHANGE => Self::ColumnsChange(payload_of(typ, payload)?),
            TYPING => Self::Typing,
            CLOSING => Self::Closing,
            other => return Err(DecodeError::UnknownType(other.to_string())),
        };
        Ok(event)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Register(_) => REGISTER,
            Self::Mask(_) => MASK,
            Self::Lock(_) => LOCK,
            Self::Message(_) => MESSAGE,
            Self::Like(_) => LIKE,
            Self::Delete(_) => DELETE,
            Self::DeleteAll => DELETE_ALL,
            Self::CategoryChange(_) => CATEGORY_CHANGE,
            Self::Timer(_) => TIMER,
            Self::ColumnsChange(_) => COLUMNS_CHANGE,
            Self::Typing => TYPING,
            Self::Closing => CLOSING,
        }
    }
}

// A missing `pyl` is read as an empty object so all-default payloads decode.
fn payload_of<T: DeserializeOwned>(typ: &str, payload: &serde_json::Value) -> Result<T, DecodeError> {
    let value = if payload.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        payload.clone()
    };
    serde_json::from_value(value).map_err(|source| DecodeError::Payload {
        typ: typ.to_string(),
        source,
    })
}
