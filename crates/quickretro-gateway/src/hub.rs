use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use quickretro_store::{BoardStore, Bridge, Delivery, Publication};
use quickretro_types::envelope::Envelope;
use quickretro_types::events::BoardEvent;

use crate::connection::{PING_PERIOD, PONG_WAIT};
use crate::events;

/// Runtime switches that change event and connection behavior.
#[derive(Debug, Clone)]
pub struct HubSettings {
    pub typing_enabled: bool,
    /// Read deadline; only a pong from the client pushes it forward.
    pub pong_wait: Duration,
    pub ping_period: Duration,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            typing_enabled: true,
            pong_wait: PONG_WAIT,
            ping_period: PING_PERIOD,
        }
    }
}

/// Identity of one live connection, as seen by event rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub conn_id: u64,
    pub user_id: String,
    pub xid: String,
}

/// A connection registered with the hub. Dropping the sender closes the
/// connection's outbound loop.
#[derive(Debug)]
pub struct Client {
    pub board_id: String,
    pub peer: Peer,
    pub tx: mpsc::Sender<String>,
}

enum Command {
    Register {
        client: Client,
        done: oneshot::Sender<()>,
    },
    Unregister {
        board_id: String,
        conn_id: u64,
        done: oneshot::Sender<()>,
    },
}

/// Handle to the process-local room registry.
///
/// Cheap to clone. All registry mutations and all local deliveries run on a
/// single control loop, so the board to connection map needs no lock.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    store: Arc<dyn BoardStore>,
    bridge: Arc<dyn Bridge>,
    settings: HubSettings,
    commands: mpsc::UnboundedSender<Command>,
    next_conn_id: AtomicU64,
}

impl Hub {
    /// Spawn the control loop. `deliveries` is the receiving end of `bridge`.
    pub fn start(
        store: Arc<dyn BoardStore>,
        bridge: Arc<dyn Bridge>,
        deliveries: mpsc::UnboundedReceiver<Delivery>,
        settings: HubSettings,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let hub = Self {
            inner: Arc::new(HubInner {
                store,
                bridge,
                settings,
                commands,
                next_conn_id: AtomicU64::new(1),
            }),
        };
        let registry = Registry {
            hub: hub.clone(),
            rooms: HashMap::new(),
        };
        tokio::spawn(registry.run(command_rx, deliveries));
        hub
    }

    pub fn store(&self) -> &dyn BoardStore {
        self.inner.store.as_ref()
    }

    pub fn bridge(&self) -> &dyn Bridge {
        self.inner.bridge.as_ref()
    }

    pub fn settings(&self) -> &HubSettings {
        &self.inner.settings
    }

    pub fn next_conn_id(&self) -> u64 {
        self.inner.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add a connection to its board. Returns once the board's bridge
    /// subscription is in place, so the caller's first event is delivered.
    pub async fn register(&self, client: Client) {
        let (done, ack) = oneshot::channel();
        if self.inner.commands.send(Command::Register { client, done }).is_ok() {
            let _ = ack.await;
        }
    }

    /// Remove a connection. A no-op if the hub already dropped it.
    pub async fn unregister(&self, board_id: &str, conn_id: u64) {
        let (done, ack) = oneshot::channel();
        let cmd = Command::Unregister {
            board_id: board_id.to_string(),
            conn_id,
            done,
        };
        if self.inner.commands.send(cmd).is_ok() {
            let _ = ack.await;
        }
    }

    /// Run one inbound envelope on behalf of `peer`. Identity fields are
    /// overwritten before the event is decoded. Unknown tags and payloads
    /// that do not decode are logged and dropped; the connection stays up.
    pub async fn dispatch(&self, board_id: &str, peer: &Peer, mut env: Envelope) {
        env.stamp(board_id, &peer.user_id, &peer.xid);
        let event = match BoardEvent::decode_inbound(&env.typ, &env.payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(board = %board_id, by = %peer.user_id, error = %e, "Ignoring inbound event");
                return;
            }
        };
        events::handle(self, env, event).await;
    }
}

/// State owned by the control loop.
struct Registry {
    hub: Hub,
    rooms: HashMap<String, HashMap<u64, Client>>,
}

impl Registry {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut deliveries: mpsc::UnboundedReceiver<Delivery>,
    ) {
        loop {
            tokio::select! {
                Some(cmd) = commands.recv() => match cmd {
                    Command::Register { client, done } => {
                        self.register(client).await;
                        let _ = done.send(());
                    }
                    Command::Unregister { board_id, conn_id, done } => {
                        self.remove(&board_id, conn_id).await;
                        let _ = done.send(());
                    }
                },
                Some(delivery) = deliveries.recv() => self.deliver(delivery).await,
                else => break,
            }
        }
        info!("Hub control loop stopped");
    }

    async fn register(&mut self, client: Client) {
        let board_id = client.board_id.clone();
        let room = self.rooms.entry(board_id.clone()).or_default();
        let first = room.is_empty();
        room.insert(client.peer.conn_id, client);

        if first {
            if let Err(e) = self.hub.bridge().subscribe(&board_id).await {
                error!(board = %board_id, error = %e, "Failed to subscribe to board channel");
            } else {
                debug!(board = %board_id, "Subscribed to board channel");
            }
        }
    }

    async fn remove(&mut self, board_id: &str, conn_id: u64) {
        let Some(room) = self.rooms.get_mut(board_id) else {
            return;
        };
        let Some(client) = room.remove(&conn_id) else {
            return;
        };
        if room.is_empty() {
            self.rooms.remove(board_id);
            if let Err(e) = self.hub.bridge().unsubscribe(board_id).await {
                error!(board = %board_id, error = %e, "Failed to unsubscribe from board channel");
            } else {
                debug!(board = %board_id, "Released board channel");
            }
        }

        // Dropping the client closes its queue; the leave notice runs off-loop
        // because its handler publishes back into this hub.
        let Client { board_id, peer, .. } = client;
        let hub = self.hub.clone();
        tokio::spawn(async move {
            let env = Envelope::closing(&board_id, &peer.user_id, &peer.xid);
            events::handle(&hub, env, BoardEvent::Closing).await;
        });
    }

    async fn deliver(&mut self, delivery: Delivery) {
        let Some(room) = self.rooms.get(&delivery.channel) else {
            return;
        };
        let publication = match Publication::decode(&delivery.payload) {
            Ok(p) => p,
            Err(e) => {
                warn!(board = %delivery.channel, error = %e, "Dropping undecodable publication");
                return;
            }
        };
        let peers: Vec<Peer> = room.values().map(|c| c.peer.clone()).collect();

        let frames = match events::render(&self.hub, &publication, &peers).await {
            Ok(frames) => frames,
            Err(e) => {
                events::log_failure(&publication.event, &e);
                return;
            }
        };

        let Some(room) = self.rooms.get(&delivery.channel) else {
            return;
        };
        let mut overflowed = Vec::new();
        for (conn_id, frame) in frames {
            let Some(client) = room.get(&conn_id) else {
                continue;
            };
            match client.tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("{} ({}) outbound queue full, dropping connection", client.peer.user_id, conn_id);
                    overflowed.push(conn_id);
                }
                Err(TrySendError::Closed(_)) => overflowed.push(conn_id),
            }
        }
        for conn_id in overflowed {
            self.remove(&delivery.channel, conn_id).await;
        }
    }
}
