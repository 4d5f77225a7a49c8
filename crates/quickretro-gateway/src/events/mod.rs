//! The board event catalog.
//!
//! Every event goes through two phases. `handle` validates, authorizes and
//! mutates the store, then publishes to the board's bridge channel. `render`
//! runs wherever that publication is delivered and turns it into one frame
//! per local recipient.

mod board;
mod message;
mod presence;
mod register;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use quickretro_store::{Publication, StoreError};
use quickretro_types::envelope::Envelope;
use quickretro_types::events::BoardEvent;
use quickretro_types::models::{Board, Message};
use quickretro_types::responses::Response;

use crate::hub::{Hub, Peer};

#[derive(Debug, Error)]
pub enum EventError {
    /// Validation or authorization failure. Never reported to the sender.
    #[error("rejected: {0}")]
    Rejected(&'static str),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type EventResult<T> = Result<T, EventError>;

pub(crate) fn reject<T>(reason: &'static str) -> EventResult<T> {
    Err(EventError::Rejected(reason))
}

/// What a successful `handle` publishes alongside the envelope.
#[derive(Debug, Default)]
pub(crate) struct Handled {
    message: Option<Message>,
    /// Replaces the inbound payload when the handler narrowed it.
    payload: Option<Value>,
}

impl Handled {
    pub(crate) fn plain() -> Self {
        Self::default()
    }

    pub(crate) fn with_message(message: Message) -> Self {
        Self {
            message: Some(message),
            payload: None,
        }
    }

    pub(crate) fn rewrite(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Run one decoded event to completion. Failures are logged and swallowed.
pub async fn handle(hub: &Hub, mut env: Envelope, event: BoardEvent) {
    let result = match &event {
        BoardEvent::Register(p) => register::handle(hub, &env, p).await,
        BoardEvent::Mask(p) => board::handle_mask(hub, &env, p).await,
        BoardEvent::Lock(p) => board::handle_lock(hub, &env, p).await,
        BoardEvent::Message(p) => message::handle_message(hub, &env, p).await,
        BoardEvent::Like(p) => message::handle_like(hub, &env, p).await,
        BoardEvent::Delete(p) => message::handle_delete(hub, &env, p).await,
        BoardEvent::DeleteAll => board::handle_delete_all(hub, &env).await,
        BoardEvent::CategoryChange(p) => message::handle_category(hub, &env, p).await,
        BoardEvent::Timer(p) => board::handle_timer(hub, &env, p).await,
        BoardEvent::ColumnsChange(p) => board::handle_columns(hub, &env, p).await,
        BoardEvent::Typing => presence::handle_typing(hub, &env).await,
        BoardEvent::Closing => presence::handle_closing(hub, &env).await,
    };

    let handled = match result {
        Ok(handled) => handled,
        Err(e) => {
            log_failure(&env, &e);
            return;
        }
    };

    if let Some(payload) = handled.payload {
        env.payload = payload;
    }
    let channel = env.board_id.clone();
    let publication = Publication {
        event: env,
        message: handled.message,
    };
    let published = match publication.encode() {
        Ok(payload) => hub.bridge().publish(&channel, payload).await.map_err(EventError::from),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = published {
        log_failure(&publication.event, &e);
    }
}

/// Render a delivered publication for the given recipients. Returns the
/// serialized frame for each connection that should receive one.
pub async fn render(hub: &Hub, publication: &Publication, peers: &[Peer]) -> EventResult<Vec<(u64, String)>> {
    let env = &publication.event;
    let event = BoardEvent::decode(&env.typ, &env.payload).map_err(|e| {
        warn!(typ = %env.typ, error = %e, "Undecodable event in publication");
        EventError::Rejected("undecodable publication")
    })?;

    let responses = match &event {
        BoardEvent::Register(p) => register::render(hub, env, p, peers).await?,
        BoardEvent::Mask(p) => to_all(peers, Response::Mask { mask: p.mask }),
        BoardEvent::Lock(p) => to_all(peers, Response::Lock { lock: p.lock }),
        BoardEvent::Message(_) => message::render_message(hub, entity(publication)?, peers).await?,
        BoardEvent::Like(_) => message::render_like(hub, entity(publication)?, peers).await?,
        BoardEvent::Delete(_) => message::render_delete(entity(publication)?, peers),
        BoardEvent::DeleteAll => to_all(peers, Response::DeleteAll),
        BoardEvent::CategoryChange(p) => message::render_category(entity(publication)?, p, peers),
        BoardEvent::Timer(_) => board::render_timer(hub, env, peers).await?,
        BoardEvent::ColumnsChange(_) => board::render_columns(hub, env, peers).await?,
        BoardEvent::Typing => presence::render_typing(hub, env, peers).await?,
        BoardEvent::Closing => presence::render_closing(hub, env, peers).await?,
    };

    responses
        .into_iter()
        .map(|(conn_id, response)| Ok((conn_id, serde_json::to_string(&response)?)))
        .collect()
}

pub(crate) fn log_failure(env: &Envelope, err: &EventError) {
    match err {
        EventError::Rejected(reason) => {
            debug!(typ = %env.typ, board = %env.board_id, by = %env.by, "Dropped event: {}", reason)
        }
        EventError::Store(e) => {
            error!(typ = %env.typ, board = %env.board_id, by = %env.by, error = %e, "Store failure, event not published")
        }
        EventError::Encode(e) => {
            error!(typ = %env.typ, board = %env.board_id, error = %e, "Failed to encode event")
        }
    }
}

pub(crate) fn to_all(peers: &[Peer], response: Response) -> Vec<(u64, Response)> {
    peers.iter().map(|p| (p.conn_id, response.clone())).collect()
}

/// The board the envelope targets. A missing board rejects the event.
pub(crate) async fn require_board(hub: &Hub, env: &Envelope) -> EventResult<Board> {
    match hub.store().get_board(&env.board_id).await? {
        Some(board) => Ok(board),
        None => reject("board not found"),
    }
}

fn entity(publication: &Publication) -> EventResult<&Message> {
    publication
        .message
        .as_ref()
        .ok_or(EventError::Rejected("publication without message"))
}
