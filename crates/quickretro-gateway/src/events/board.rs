//! Owner-only board settings: mask, lock, timer, columns and delete-all.

use std::collections::HashSet;

use chrono::Utc;

use quickretro_types::envelope::Envelope;
use quickretro_types::events::{ColumnsChangePayload, LockPayload, MaskPayload, TimerPayload};
use quickretro_types::limits::{MAX_TIMER_SECONDS, validate_columns};
use quickretro_types::models::Board;
use quickretro_types::responses::Response;

use super::{EventError, EventResult, Handled, reject, require_board, to_all};
use crate::hub::{Hub, Peer};

async fn owned_board(hub: &Hub, env: &Envelope) -> EventResult<Board> {
    let board = require_board(hub, env).await?;
    if !board.is_owner(&env.by) {
        return reject("only the board owner may do this");
    }
    Ok(board)
}

pub(super) async fn handle_mask(hub: &Hub, env: &Envelope, p: &MaskPayload) -> EventResult<Handled> {
    let board = owned_board(hub, env).await?;
    if board.mask == p.mask {
        return reject("mask unchanged");
    }
    hub.store().update_mask(&board.id, p.mask).await?;
    Ok(Handled::plain())
}

pub(super) async fn handle_lock(hub: &Hub, env: &Envelope, p: &LockPayload) -> EventResult<Handled> {
    let board = owned_board(hub, env).await?;
    if board.lock == p.lock {
        return reject("lock unchanged");
    }
    hub.store().update_lock(&board.id, p.lock).await?;
    Ok(Handled::plain())
}

pub(super) async fn handle_delete_all(hub: &Hub, env: &Envelope) -> EventResult<Handled> {
    let board = owned_board(hub, env).await?;
    hub.store().delete_all(&board.id).await?;
    Ok(Handled::plain())
}

pub(super) async fn handle_timer(hub: &Hub, env: &Envelope, p: &TimerPayload) -> EventResult<Handled> {
    let board = owned_board(hub, env).await?;
    let running = board.timer_running(Utc::now().timestamp());

    if p.stop {
        if !running {
            return reject("no timer to stop");
        }
        hub.store().stop_timer(&board.id).await?;
        return Ok(Handled::plain());
    }

    if p.expiry_duration_in_seconds == 0 || p.expiry_duration_in_seconds > MAX_TIMER_SECONDS {
        return reject("timer duration out of range");
    }
    if running {
        return reject("timer already running");
    }
    hub.store().start_timer(&board.id, p.expiry_duration_in_seconds).await?;
    Ok(Handled::plain())
}

pub(super) async fn handle_columns(hub: &Hub, env: &Envelope, p: &ColumnsChangePayload) -> EventResult<Handled> {
    let board = owned_board(hub, env).await?;
    if board.lock {
        return reject("board is locked");
    }
    validate_columns(&p.columns).map_err(EventError::Rejected)?;

    let store = hub.store();
    let old = store.get_columns(&board.id).await?;
    let keep: HashSet<&str> = p.columns.iter().map(|c| c.id.as_str()).collect();
    let removed: Vec<String> = old
        .iter()
        .filter(|c| !keep.contains(c.id.as_str()))
        .map(|c| c.id.clone())
        .collect();

    if !removed.is_empty() && store.has_messages_in_columns(&board.id, &removed).await? {
        return reject("cannot remove a column that still has messages");
    }
    store.reset_columns(&board, &old, &p.columns).await?;
    Ok(Handled::plain())
}

pub(super) async fn render_timer(hub: &Hub, env: &Envelope, peers: &[Peer]) -> EventResult<Vec<(u64, Response)>> {
    let board = require_board(hub, env).await?;
    let expires_in_seconds = board.timer_remaining(Utc::now().timestamp());
    Ok(to_all(peers, Response::Timer { expires_in_seconds }))
}

/// Columns are re-read so every process renders what the store holds.
pub(super) async fn render_columns(hub: &Hub, env: &Envelope, peers: &[Peer]) -> EventResult<Vec<(u64, Response)>> {
    let columns = hub.store().get_columns(&env.board_id).await?;
    Ok(to_all(peers, Response::ColumnsChange { columns }))
}
