use quickretro_types::envelope::Envelope;
use quickretro_types::responses::{Response, UserDetails};

use super::{EventResult, Handled, reject};
use crate::hub::{Hub, Peer};

pub(super) async fn handle_closing(hub: &Hub, env: &Envelope) -> EventResult<Handled> {
    if env.by.is_empty() || env.board_id.is_empty() {
        return reject("closing without identity");
    }
    hub.store().remove_presence(&env.board_id, &env.by).await?;
    Ok(Handled::plain())
}

pub(super) async fn handle_typing(hub: &Hub, _env: &Envelope) -> EventResult<Handled> {
    if !hub.settings().typing_enabled {
        return reject("typing indicator disabled");
    }
    Ok(Handled::plain())
}

/// Remaining participants, sent to everyone but the leaving user.
pub(super) async fn render_closing(hub: &Hub, env: &Envelope, peers: &[Peer]) -> EventResult<Vec<(u64, Response)>> {
    let users: Vec<UserDetails> = hub
        .store()
        .get_presence(&env.board_id)
        .await?
        .iter()
        .map(UserDetails::from)
        .collect();
    Ok(others(peers, &env.by, Response::Closing { users }))
}

pub(super) async fn render_typing(hub: &Hub, env: &Envelope, peers: &[Peer]) -> EventResult<Vec<(u64, Response)>> {
    let nickname = hub
        .store()
        .get_presence(&env.board_id)
        .await?
        .into_iter()
        .find(|u| u.id == env.by)
        .map(|u| u.nickname)
        .unwrap_or_default();
    let response = Response::Typing {
        xid: env.xid.clone(),
        nickname,
    };
    Ok(others(peers, &env.by, response))
}

fn others(peers: &[Peer], user_id: &str, response: Response) -> Vec<(u64, Response)> {
    peers
        .iter()
        .filter(|p| p.user_id != user_id)
        .map(|p| (p.conn_id, response.clone()))
        .collect()
}
