use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoardStatus {
    #[default]
    InProgress,
    Paused,
    Completed,
}

impl BoardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "inProgress",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    /// Numeric form used in hash storage.
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::InProgress => 0,
            Self::Paused => 1,
            Self::Completed => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::InProgress),
            1 => Some(Self::Paused),
            2 => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A retrospective board. Exactly one owner, fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub team: String,
    pub owner: String,
    pub status: BoardStatus,
    pub mask: bool,
    pub lock: bool,
    pub timer_expires_at_utc: i64,
    pub created_at_utc: i64,
    pub auto_delete_at_utc: i64,
}

impl Board {
    pub fn is_owner(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.owner == user_id
    }

    /// Seconds left on the board timer at `now_utc`, clamped at zero.
    pub fn timer_remaining(&self, now_utc: i64) -> u64 {
        (self.timer_expires_at_utc - now_utc).max(0) as u64
    }

    pub fn timer_running(&self, now_utc: i64) -> bool {
        self.timer_expires_at_utc > now_utc
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_default: bool,
    pub color: String,
    #[serde(default, rename = "pos")]
    pub position: i64,
}

/// A note on the board. A non-empty `parent_id` makes it a comment.
///
/// `author_id` is kept even for anonymous notes so that authorship checks keep
/// working; it is never rendered to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub author_id: String,
    pub author_xid: String,
    pub author_nickname: String,
    pub board_id: String,
    pub content: String,
    pub category: String,
    pub anonymous: bool,
    pub parent_id: String,
}

impl Message {
    pub fn is_comment(&self) -> bool {
        !self.parent_id.is_empty()
    }

    pub fn is_author(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.author_id == user_id
    }
}

/// A participant's presence record on one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub xid: String,
    pub nickname: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LikeInfo {
    pub count: i64,
    pub liked: bool,
}

/// How a saved message is indexed on its board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Overwrite the record only.
    Update,
    NewMessage,
    NewComment,
}
