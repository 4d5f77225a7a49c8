//! Hash field mapping for the records kept in Redis.

use std::collections::HashMap;

use quickretro_types::models::{Board, BoardColumn, BoardStatus, Message, User};

use crate::error::{StoreError, StoreResult};

pub type Fields = HashMap<String, String>;

pub fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

struct Reader<'a> {
    key: &'a str,
    fields: &'a Fields,
}

impl<'a> Reader<'a> {
    fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    fn int(&self, name: &str) -> StoreResult<i64> {
        match self.fields.get(name) {
            None => Ok(0),
            Some(raw) if raw.is_empty() => Ok(0),
            Some(raw) => raw.parse().map_err(|_| self.corrupt(name, raw)),
        }
    }

    fn flag(&self, name: &str) -> StoreResult<bool> {
        match self.fields.get(name).map(String::as_str) {
            None | Some("") | Some("0") | Some("false") => Ok(false),
            Some("1") | Some("true") => Ok(true),
            Some(raw) => Err(self.corrupt(name, raw)),
        }
    }

    fn corrupt(&self, name: &str, raw: &str) -> StoreError {
        StoreError::Corrupt {
            key: self.key.to_string(),
            reason: format!("field {name} holds {raw:?}"),
        }
    }
}

/// An empty hash (or one without `id`) means the key does not exist.
fn reader<'a>(key: &'a str, fields: &'a Fields) -> Option<Reader<'a>> {
    fields
        .get("id")
        .is_some_and(|id| !id.is_empty())
        .then_some(Reader { key, fields })
}

pub fn board_fields(board: &Board) -> Vec<(&'static str, String)> {
    vec![
        ("id", board.id.clone()),
        ("name", board.name.clone()),
        ("team", board.team.clone()),
        ("owner", board.owner.clone()),
        ("status", board.status.as_i64().to_string()),
        ("mask", flag(board.mask).into()),
        ("lock", flag(board.lock).into()),
        ("timerExpiresAtUtc", board.timer_expires_at_utc.to_string()),
        ("createdAtUtc", board.created_at_utc.to_string()),
        ("autoDeleteAtUtc", board.auto_delete_at_utc.to_string()),
    ]
}

pub fn board_from(key: &str, fields: &Fields) -> StoreResult<Option<Board>> {
    let Some(r) = reader(key, fields) else {
        return Ok(None);
    };
    let status = r.int("status")?;
    Ok(Some(Board {
        id: r.text("id"),
        name: r.text("name"),
        team: r.text("team"),
        owner: r.text("owner"),
        status: BoardStatus::from_i64(status).ok_or_else(|| r.corrupt("status", &status.to_string()))?,
        mask: r.flag("mask")?,
        lock: r.flag("lock")?,
        timer_expires_at_utc: r.int("timerExpiresAtUtc")?,
        created_at_utc: r.int("createdAtUtc")?,
        auto_delete_at_utc: r.int("autoDeleteAtUtc")?,
    }))
}

pub fn column_fields(col: &BoardColumn) -> Vec<(&'static str, String)> {
    vec![
        ("id", col.id.clone()),
        ("text", col.text.clone()),
        ("isDefault", flag(col.is_default).into()),
        ("color", col.color.clone()),
        ("pos", col.position.to_string()),
    ]
}

pub fn column_from(key: &str, fields: &Fields) -> StoreResult<Option<BoardColumn>> {
    let Some(r) = reader(key, fields) else {
        return Ok(None);
    };
    Ok(Some(BoardColumn {
        id: r.text("id"),
        text: r.text("text"),
        is_default: r.flag("isDefault")?,
        color: r.text("color"),
        position: r.int("pos")?,
    }))
}

pub fn message_fields(msg: &Message) -> Vec<(&'static str, String)> {
    vec![
        ("id", msg.id.clone()),
        ("by", msg.author_id.clone()),
        ("byxid", msg.author_xid.clone()),
        ("nickname", msg.author_nickname.clone()),
        ("group", msg.board_id.clone()),
        ("content", msg.content.clone()),
        ("category", msg.category.clone()),
        ("anon", flag(msg.anonymous).into()),
        ("pid", msg.parent_id.clone()),
    ]
}

pub fn message_from(key: &str, fields: &Fields) -> StoreResult<Option<Message>> {
    let Some(r) = reader(key, fields) else {
        return Ok(None);
    };
    Ok(Some(Message {
        id: r.text("id"),
        author_id: r.text("by"),
        author_xid: r.text("byxid"),
        author_nickname: r.text("nickname"),
        board_id: r.text("group"),
        content: r.text("content"),
        category: r.text("category"),
        anonymous: r.flag("anon")?,
        parent_id: r.text("pid"),
    }))
}

pub fn user_fields(user: &User) -> Vec<(&'static str, String)> {
    vec![
        ("id", user.id.clone()),
        ("xid", user.xid.clone()),
        ("nickname", user.nickname.clone()),
    ]
}

pub fn user_from(key: &str, fields: &Fields) -> Option<User> {
    reader(key, fields).map(|r| User {
        id: r.text("id"),
        xid: r.text("xid"),
        nickname: r.text("nickname"),
    })
}
