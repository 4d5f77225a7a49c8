use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{error, info, warn};

use quickretro_types::envelope::Envelope;

use crate::hub::{Client, Hub, Peer};

/// Time allowed to write one frame.
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Default time allowed between liveness replies from the client.
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Pings go out a little more often than the read deadline.
pub const PING_PERIOD: Duration = Duration::from_secs(54);

/// Outbound frames buffered per connection before it is dropped.
pub const SEND_QUEUE: usize = 256;

/// Close reason sent when the handshake names a board that does not exist.
pub const BOARD_NOT_FOUND: &str = "BOARDNOTFOUND";

/// Serve one upgraded socket until it disconnects.
pub async fn serve(socket: WebSocket, hub: Hub, board_id: String, user_id: String) {
    let (mut sender, mut receiver) = socket.split();

    match hub.store().board_exists(&board_id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!("{} tried to join unknown board {}", user_id, board_id);
            close(&mut sender, close_code::POLICY, BOARD_NOT_FOUND).await;
            return;
        }
        Err(e) => {
            error!(board = %board_id, error = %e, "Board lookup failed during handshake");
            close(&mut sender, close_code::ERROR, "").await;
            return;
        }
    }

    let xid = match hub.store().allocate_xid(&board_id, &user_id).await {
        Ok(xid) => xid,
        Err(e) => {
            error!(board = %board_id, error = %e, "Could not allocate external id");
            close(&mut sender, close_code::ERROR, "").await;
            return;
        }
    };

    let (tx, rx) = mpsc::channel(SEND_QUEUE);
    let peer = Peer {
        conn_id: hub.next_conn_id(),
        user_id,
        xid,
    };
    hub.register(Client {
        board_id: board_id.clone(),
        peer: peer.clone(),
        tx,
    })
    .await;
    info!("{} ({}) connected to board {}", peer.user_id, peer.xid, board_id);

    let pong_wait = hub.settings().pong_wait;
    let mut writer = tokio::spawn(write_loop(sender, rx, hub.settings().ping_period));
    let mut writer_done = false;
    let mut deadline = Instant::now() + pong_wait;

    loop {
        let next = tokio::select! {
            _ = &mut writer => {
                writer_done = true;
                break;
            }
            next = timeout_at(deadline, receiver.next()) => next,
        };
        let msg = match next {
            Err(_) => {
                info!("{} ({}) missed liveness deadline", peer.user_id, peer.xid);
                break;
            }
            Ok(None) | Ok(Some(Err(_))) => break,
            Ok(Some(Ok(msg))) => msg,
        };

        let raw = match msg {
            Message::Text(text) => text.to_string(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    warn!("{} ({}) sent a non-UTF-8 frame", peer.user_id, peer.xid);
                    break;
                }
            },
            Message::Pong(_) => {
                deadline = Instant::now() + pong_wait;
                continue;
            }
            Message::Ping(_) => continue,
            Message::Close(_) => break,
        };

        let env: Envelope = match serde_json::from_str(&raw) {
            Ok(env) => env,
            Err(e) => {
                let preview: String = raw.chars().take(200).collect();
                warn!("{} ({}) bad frame: {} -- raw: {}", peer.user_id, peer.xid, e, preview);
                break;
            }
        };
        // Handling runs inline, so an accepted event completes even if the
        // socket drops while it runs.
        hub.dispatch(&board_id, &peer, env).await;
    }

    hub.unregister(&board_id, peer.conn_id).await;
    if !writer_done {
        // The hub dropped our queue; give the writer a moment to send Close.
        let _ = timeout(WRITE_WAIT, writer).await;
    }
    info!("{} ({}) disconnected from board {}", peer.user_id, peer.xid, board_id);
}

/// Drain the outbound queue into the socket and keep it alive with pings.
/// Returns when the queue closes or a write fails.
pub async fn write_loop<S>(mut sink: S, mut rx: mpsc::Receiver<String>, ping_period: Duration)
where
    S: Sink<Message> + Unpin,
{
    let mut heartbeat = tokio::time::interval(ping_period);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    close(&mut sink, close_code::NORMAL, "").await;
                    return;
                };
                if !matches!(timeout(WRITE_WAIT, sink.send(Message::Text(frame.into()))).await, Ok(Ok(()))) {
                    return;
                }
            }
            _ = heartbeat.tick() => {
                if !matches!(timeout(WRITE_WAIT, sink.send(Message::Ping(Vec::new().into()))).await, Ok(Ok(()))) {
                    return;
                }
            }
        }
    }
}

async fn close<S>(sink: &mut S, code: u16, reason: &str)
where
    S: Sink<Message> + Unpin,
{
    let frame = CloseFrame {
        code,
        reason: reason.to_string().into(),
    };
    let _ = timeout(WRITE_WAIT, sink.send(Message::Close(Some(frame)))).await;
}
