use chrono::Utc;

use quickretro_types::envelope::Envelope;
use quickretro_types::events::RegisterPayload;
use quickretro_types::limits::valid_text;
use quickretro_types::models::{Message, User};
use quickretro_types::responses::{MessageResponse, RegisterResponse, Response, UserDetails};

use super::{EventResult, Handled, reject, require_board};
use crate::hub::{Hub, Peer};

pub(super) async fn handle(hub: &Hub, env: &Envelope, p: &RegisterPayload) -> EventResult<Handled> {
    if env.by.is_empty() || env.xid.is_empty() {
        return reject("register without identity");
    }
    if !valid_text(&p.nickname) {
        return reject("nickname too long");
    }
    let store = hub.store();
    if !store.board_exists(&env.board_id).await? {
        return reject("board not found");
    }
    let user = User {
        id: env.by.clone(),
        xid: env.xid.clone(),
        nickname: p.nickname.clone(),
    };
    store.commit_presence(&env.board_id, &user).await?;
    Ok(Handled::plain())
}

/// The registering user gets the full board snapshot; everyone else a
/// joining notice. Any failed read abandons the whole delivery.
pub(super) async fn render(
    hub: &Hub,
    env: &Envelope,
    p: &RegisterPayload,
    peers: &[Peer],
) -> EventResult<Vec<(u64, Response)>> {
    let joining = UserDetails::from(&User {
        id: env.by.clone(),
        xid: env.xid.clone(),
        nickname: p.nickname.clone(),
    });
    let joining = Response::Joining {
        nickname: joining.nickname,
        xid: joining.xid,
    };

    if !peers.iter().any(|peer| peer.user_id == env.by) {
        return Ok(peers.iter().map(|peer| (peer.conn_id, joining.clone())).collect());
    }
    let snapshot = Response::Register(snapshot(hub, env).await?);

    Ok(peers
        .iter()
        .map(|peer| {
            let response = if peer.user_id == env.by {
                snapshot.clone()
            } else {
                joining.clone()
            };
            (peer.conn_id, response)
        })
        .collect())
}

async fn snapshot(hub: &Hub, env: &Envelope) -> EventResult<RegisterResponse> {
    let store = hub.store();
    let board = require_board(hub, env).await?;
    let columns = store.get_columns(&board.id).await?;
    let users = store.get_presence(&board.id).await?;
    let messages = store.get_messages(&board.id).await?;
    let comments = store.get_comments(&board.id).await?;

    let now = Utc::now().timestamp();
    Ok(RegisterResponse {
        board_name: board.name.clone(),
        board_team: board.team.clone(),
        board_status: board.status.as_str().to_string(),
        board_masking: board.mask,
        board_lock: board.lock,
        is_board_owner: board.is_owner(&env.by),
        mine: true,
        columns,
        users: users.iter().map(UserDetails::from).collect(),
        messages: personalize(hub, &env.by, &messages).await?,
        comments: personalize(hub, &env.by, &comments).await?,
        timer_expires_in_seconds: board.timer_remaining(now),
        board_expiry_time_utc_seconds: board.auto_delete_at_utc,
    })
}

async fn personalize(hub: &Hub, user_id: &str, messages: &[Message]) -> EventResult<Vec<MessageResponse>> {
    let ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
    let likes = hub.store().likes_info(user_id, &ids).await?;
    Ok(messages
        .iter()
        .map(|m| {
            let info = likes.get(&m.id).copied().unwrap_or_default();
            MessageResponse::render(m, user_id, info.count, info.liked)
        })
        .collect())
}
