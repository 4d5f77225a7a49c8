//! Notes and comments: create/update, like, delete and category moves.

use serde_json::json;

use quickretro_types::envelope::Envelope;
use quickretro_types::events::{CategoryChangePayload, DeletePayload, LikePayload, MessagePayload};
use quickretro_types::limits::valid_id;
use quickretro_types::models::{Board, Message, SaveMode};
use quickretro_types::responses::{MessageResponse, Response};

use super::{EventResult, Handled, reject, require_board, to_all};
use crate::hub::{Hub, Peer};

/// Load a message of this board that the sender may modify.
async fn editable(hub: &Hub, env: &Envelope, board: &Board, message_id: &str) -> EventResult<Message> {
    let Some(message) = hub.store().get_message(message_id).await? else {
        return reject("message not found");
    };
    if message.board_id != board.id {
        return reject("message belongs to another board");
    }
    if !message.is_author(&env.by) && !board.is_owner(&env.by) {
        return reject("only the author or the board owner may do this");
    }
    Ok(message)
}

async fn unlocked_board(hub: &Hub, env: &Envelope) -> EventResult<Board> {
    let board = require_board(hub, env).await?;
    if board.lock {
        return reject("board is locked");
    }
    Ok(board)
}

/// Ids from `requested` that are comments of `parent` on the same board.
async fn comments_of(hub: &Hub, parent: &Message, requested: &[String]) -> EventResult<Vec<String>> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }
    Ok(hub
        .store()
        .get_messages_by_ids(requested)
        .await?
        .into_iter()
        .filter(|c| c.parent_id == parent.id && c.board_id == parent.board_id)
        .map(|c| c.id)
        .collect())
}

pub(super) async fn handle_message(hub: &Hub, env: &Envelope, p: &MessagePayload) -> EventResult<Handled> {
    let board = unlocked_board(hub, env).await?;
    let store = hub.store();

    if let Some(mut existing) = store.get_message(&p.id).await? {
        if existing.board_id != board.id {
            return reject("message belongs to another board");
        }
        if !existing.is_author(&env.by) && !board.is_owner(&env.by) {
            return reject("only the author or the board owner may edit");
        }
        // Only the text changes on edit. Identity, parent, column and
        // anonymity stay as first stored.
        existing.content = p.content.clone();
        store.save_message(&existing, SaveMode::Update).await?;
        return Ok(Handled::with_message(existing));
    }

    if !valid_id(&p.id) {
        return reject("invalid message id");
    }

    let (category, mode) = if p.parent_id.is_empty() {
        let columns = store.get_columns(&board.id).await?;
        if !columns.iter().any(|c| c.id == p.category) {
            return reject("unknown column");
        }
        (p.category.clone(), SaveMode::NewMessage)
    } else {
        let Some(parent) = store.get_message(&p.parent_id).await? else {
            return reject("parent not found");
        };
        if parent.board_id != board.id {
            return reject("parent belongs to another board");
        }
        if parent.is_comment() {
            return reject("comments cannot be nested");
        }
        (parent.category, SaveMode::NewComment)
    };

    let (author_xid, author_nickname) = if p.anonymous {
        (String::new(), String::new())
    } else {
        (env.xid.clone(), p.nickname.clone())
    };
    let message = Message {
        id: p.id.clone(),
        author_id: env.by.clone(),
        author_xid,
        author_nickname,
        board_id: board.id.clone(),
        content: p.content.clone(),
        category,
        anonymous: p.anonymous,
        parent_id: p.parent_id.clone(),
    };
    store.save_message(&message, mode).await?;
    Ok(Handled::with_message(message))
}

pub(super) async fn handle_like(hub: &Hub, env: &Envelope, p: &LikePayload) -> EventResult<Handled> {
    let store = hub.store();
    let Some(message) = store.get_message(&p.msg_id).await? else {
        return reject("message not found");
    };
    if message.board_id != env.board_id {
        return reject("message belongs to another board");
    }
    if !store.toggle_like(&message.id, &env.by, p.like).await? {
        return reject("like unchanged");
    }
    Ok(Handled::with_message(message))
}

pub(super) async fn handle_delete(hub: &Hub, env: &Envelope, p: &DeletePayload) -> EventResult<Handled> {
    let board = unlocked_board(hub, env).await?;
    let message = editable(hub, env, &board, &p.msg_id).await?;
    let store = hub.store();

    if message.is_comment() {
        store.delete_comment(&board.id, &message.id).await?;
    } else {
        // Comments not listed by the caller stay behind until the board expires.
        let comment_ids = comments_of(hub, &message, &p.comment_ids).await?;
        store.delete_message(&board.id, &message.id, &comment_ids).await?;
    }
    Ok(Handled::with_message(message))
}

pub(super) async fn handle_category(hub: &Hub, env: &Envelope, p: &CategoryChangePayload) -> EventResult<Handled> {
    let board = unlocked_board(hub, env).await?;
    let mut message = editable(hub, env, &board, &p.msg_id).await?;
    if message.is_comment() {
        return reject("comments follow their parent's column");
    }
    if message.category == p.new_category {
        return reject("category unchanged");
    }

    let store = hub.store();
    let columns = store.get_columns(&board.id).await?;
    if !columns.iter().any(|c| c.id == p.new_category) {
        return reject("unknown column");
    }

    let comment_ids = comments_of(hub, &message, &p.comment_ids).await?;
    store.update_category(&p.new_category, &message.id, &comment_ids).await?;

    let old_category = std::mem::replace(&mut message.category, p.new_category.clone());
    let payload = json!({
        "msgId": message.id,
        "oldCategory": old_category,
        "newCategory": p.new_category,
        "commentIds": comment_ids,
    });
    Ok(Handled::with_message(message).rewrite(payload))
}

pub(super) async fn render_message(hub: &Hub, message: &Message, peers: &[Peer]) -> EventResult<Vec<(u64, Response)>> {
    let likers = hub.store().likers(&message.id).await?;
    let likes = likers.len() as i64;
    Ok(peers
        .iter()
        .map(|peer| {
            let liked = likers.contains(&peer.user_id);
            let rendered = MessageResponse::render(message, &peer.user_id, likes, liked);
            (peer.conn_id, Response::Message(rendered))
        })
        .collect())
}

pub(super) async fn render_like(hub: &Hub, message: &Message, peers: &[Peer]) -> EventResult<Vec<(u64, Response)>> {
    let likers = hub.store().likers(&message.id).await?;
    let likes = likers.len() as i64;
    Ok(peers
        .iter()
        .map(|peer| {
            let response = Response::Like {
                id: message.id.clone(),
                likes,
                liked: likers.contains(&peer.user_id),
            };
            (peer.conn_id, response)
        })
        .collect())
}

pub(super) fn render_delete(message: &Message, peers: &[Peer]) -> Vec<(u64, Response)> {
    let response = Response::Delete {
        id: message.id.clone(),
        pid: message.parent_id.clone(),
    };
    to_all(peers, response)
}

pub(super) fn render_category(message: &Message, p: &CategoryChangePayload, peers: &[Peer]) -> Vec<(u64, Response)> {
    let response = Response::CategoryChange {
        id: message.id.clone(),
        cat: message.category.clone(),
        comment_ids: p.comment_ids.clone(),
    };
    to_all(peers, response)
}
