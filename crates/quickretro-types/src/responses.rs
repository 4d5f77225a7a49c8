use serde::{Deserialize, Serialize};

use crate::models::{BoardColumn, Message, User};

/// Frames pushed to board participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "typ")]
pub enum Response {
    #[serde(rename = "reg")]
    Register(RegisterResponse),

    #[serde(rename = "joining")]
    Joining { nickname: String, xid: String },

    #[serde(rename = "closing")]
    Closing { users: Vec<UserDetails> },

    #[serde(rename = "mask")]
    Mask { mask: bool },

    #[serde(rename = "lock")]
    Lock { lock: bool },

    #[serde(rename = "msg")]
    Message(MessageResponse),

    #[serde(rename = "like")]
    Like { id: String, likes: i64, liked: bool },

    #[serde(rename = "del")]
    Delete { id: String, pid: String },

    #[serde(rename = "delall")]
    DeleteAll,

    #[serde(rename = "catchng", rename_all = "camelCase")]
    CategoryChange {
        id: String,
        cat: String,
        comment_ids: Vec<String>,
    },

    #[serde(rename = "timer", rename_all = "camelCase")]
    Timer { expires_in_seconds: u64 },

    #[serde(rename = "colreset")]
    ColumnsChange { columns: Vec<BoardColumn> },

    #[serde(rename = "t")]
    Typing { xid: String, nickname: String },
}

/// Snapshot sent to a participant right after they register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub board_name: String,
    pub board_team: String,
    pub board_status: String,
    pub board_masking: bool,
    pub board_lock: bool,
    pub is_board_owner: bool,
    pub mine: bool,
    pub columns: Vec<BoardColumn>,
    pub users: Vec<UserDetails>,
    pub messages: Vec<MessageResponse>,
    pub comments: Vec<MessageResponse>,
    pub timer_expires_in_seconds: u64,
    pub board_expiry_time_utc_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub nickname: String,
    pub xid: String,
}

impl From<&User> for UserDetails {
    fn from(user: &User) -> Self {
        let nickname = if user.nickname.is_empty() {
            "Anonymous".to_string()
        } else {
            user.nickname.clone()
        };
        Self {
            nickname,
            xid: user.xid.clone(),
        }
    }
}

/// A message as one recipient sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub pid: String,
    pub byxid: String,
    pub nickname: String,
    pub msg: String,
    pub cat: String,
    pub likes: i64,
    pub liked: bool,
    pub mine: bool,
    pub anon: bool,
}

impl MessageResponse {
    /// Render `message` for the participant `recipient`. Anonymous messages
    /// never carry author identity.
    pub fn render(message: &Message, recipient: &str, likes: i64, liked: bool) -> Self {
        let (byxid, nickname) = if message.anonymous {
            (String::new(), String::new())
        } else {
            (message.author_xid.clone(), message.author_nickname.clone())
        };
        Self {
            id: message.id.clone(),
            pid: message.parent_id.clone(),
            byxid,
            nickname,
            msg: message.content.clone(),
            cat: message.category.clone(),
            likes,
            liked,
            mine: message.is_author(recipient),
            anon: message.anonymous,
        }
    }
}
