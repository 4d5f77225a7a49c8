#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use quickretro_gateway::{Client, Hub, HubSettings, Peer};
use quickretro_store::memory::{MemoryBridge, MemoryBus, MemoryStore};
use quickretro_store::BoardStore;
use quickretro_types::envelope::Envelope;
use quickretro_types::models::{Board, BoardColumn, BoardStatus};

pub const BOARD: &str = "b1";
pub const OWNER: &str = "u1";

pub struct Harness {
    pub hub: Hub,
    pub store: Arc<MemoryStore>,
    pub bus: MemoryBus,
    pub bridge: MemoryBridge,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_settings(HubSettings::default()).await
    }

    pub async fn with_settings(settings: HubSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        seed_board(&store).await;
        Self::on(store, MemoryBus::new(), settings)
    }

    /// Another process sharing the same store and bus.
    pub fn on(store: Arc<MemoryStore>, bus: MemoryBus, settings: HubSettings) -> Self {
        let (bridge, deliveries) = bus.attach();
        let hub = Hub::start(store.clone(), Arc::new(bridge.clone()), deliveries, settings);
        Self { hub, store, bus, bridge }
    }

    pub async fn connect(&self, user: &str) -> Conn {
        self.connect_with_queue(BOARD, user, 256).await
    }

    pub async fn connect_with_queue(&self, board: &str, user: &str, capacity: usize) -> Conn {
        let xid = self.store.allocate_xid(board, user).await.unwrap();
        let (tx, rx) = mpsc::channel(capacity);
        let peer = Peer {
            conn_id: self.hub.next_conn_id(),
            user_id: user.to_string(),
            xid,
        };
        self.hub
            .register(Client {
                board_id: board.to_string(),
                peer: peer.clone(),
                tx,
            })
            .await;
        Conn {
            hub: self.hub.clone(),
            board: board.to_string(),
            peer,
            rx,
        }
    }

    /// Connect and register, consuming the register snapshot.
    pub async fn join(&self, user: &str, nickname: &str) -> Conn {
        let mut conn = self.connect(user).await;
        conn.send("reg", serde_json::json!({ "nickname": nickname })).await;
        let reg = conn.next().await;
        assert_eq!(reg["typ"], "reg");
        conn
    }
}

pub struct Conn {
    pub hub: Hub,
    pub board: String,
    pub peer: Peer,
    pub rx: mpsc::Receiver<String>,
}

impl Conn {
    pub async fn send(&self, typ: &str, payload: Value) {
        let env = Envelope {
            typ: typ.to_string(),
            board_id: "spoofed".into(),
            by: "spoofed".into(),
            xid: "spoofed".into(),
            payload,
        };
        self.hub.dispatch(&self.board, &self.peer, env).await;
    }

    pub async fn next(&mut self) -> Value {
        let frame = tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection queue closed");
        serde_json::from_str(&frame).unwrap()
    }

    /// Next frame of type `typ`, skipping unrelated notices.
    pub async fn next_of(&mut self, typ: &str) -> Value {
        loop {
            let frame = self.next().await;
            if frame["typ"] == typ {
                return frame;
            }
        }
    }

    pub async fn assert_silent(&mut self) {
        let got = tokio::time::timeout(Duration::from_millis(150), self.rx.recv()).await;
        assert!(got.is_err(), "expected no frame, got {:?}", got);
    }

    pub async fn leave(&self) {
        self.hub.unregister(&self.board, self.peer.conn_id).await;
    }
}

pub fn columns() -> Vec<BoardColumn> {
    ["colA", "colB", "colC"]
        .into_iter()
        .enumerate()
        .map(|(i, id)| BoardColumn {
            id: id.into(),
            text: format!("Column {id}"),
            is_default: i == 0,
            color: "green".into(),
            position: i as i64 + 1,
        })
        .collect()
}

pub async fn seed_board(store: &MemoryStore) {
    let now = chrono::Utc::now().timestamp();
    let board = Board {
        id: BOARD.into(),
        name: "Sprint 12".into(),
        team: "Core".into(),
        owner: OWNER.into(),
        status: BoardStatus::InProgress,
        mask: false,
        lock: false,
        timer_expires_at_utc: 0,
        created_at_utc: now,
        auto_delete_at_utc: now + 3600,
    };
    store.create_board(&board, &columns()).await.unwrap();
}

pub fn note(id: &str, cat: &str, msg: &str) -> Value {
    serde_json::json!({ "id": id, "nickname": "Ann", "msg": msg, "cat": cat, "pid": "", "anon": false })
}
