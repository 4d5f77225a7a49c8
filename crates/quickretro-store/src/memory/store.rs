use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use quickretro_types::models::{Board, BoardColumn, LikeInfo, Message, SaveMode, User};

use crate::error::{StoreError, StoreResult};
use crate::store::BoardStore;

/// Everything stored under one board id.
#[derive(Default)]
struct BoardRecord {
    board: Option<Board>,
    columns: HashMap<String, BoardColumn>,
    message_ids: HashSet<String>,
    comment_ids: HashSet<String>,
    presence: HashMap<String, User>,
    xids: HashMap<String, String>,
    xid_seq: u64,
}

#[derive(Default)]
struct Tables {
    boards: HashMap<String, BoardRecord>,
    messages: HashMap<String, Message>,
    likes: HashMap<String, HashSet<String>>,
}

impl Tables {
    /// Drop boards whose auto-delete time has passed, with every record filed
    /// under them.
    fn sweep(&mut self, now: i64) {
        let expired: Vec<String> = self
            .boards
            .iter()
            .filter(|(_, r)| r.board.as_ref().is_some_and(|b| b.auto_delete_at_utc <= now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            debug!(board = %id, "board expired");
            self.purge(&id);
        }
    }

    fn purge(&mut self, board_id: &str) {
        if let Some(record) = self.boards.remove(board_id) {
            for id in record.message_ids.iter().chain(record.comment_ids.iter()) {
                self.messages.remove(id);
                self.likes.remove(id);
            }
        }
    }

    fn record(&mut self, board_id: &str) -> &mut BoardRecord {
        self.boards.entry(board_id.to_string()).or_default()
    }

    fn board_mut(&mut self, board_id: &str) -> Option<&mut Board> {
        self.boards.get_mut(board_id).and_then(|r| r.board.as_mut())
    }

    fn collect(&self, ids: &HashSet<String>) -> Vec<Message> {
        ids.iter().filter_map(|id| self.messages.get(id).cloned()).collect()
    }
}

/// Single-process store backed by maps behind a mutex.
///
/// Expiry is applied lazily: every call first sweeps boards past their
/// `auto_delete_at_utc`.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn with_tables<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Tables) -> T,
    {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        tables.sweep(Utc::now().timestamp());
        Ok(f(&mut tables))
    }
}

#[async_trait]
impl BoardStore for MemoryStore {
    async fn create_board(&self, board: &Board, columns: &[BoardColumn]) -> StoreResult<()> {
        self.with_tables(|t| {
            let record = t.record(&board.id);
            record.board = Some(board.clone());
            record.columns = columns.iter().map(|c| (c.id.clone(), c.clone())).collect();
        })
    }

    async fn board_exists(&self, board_id: &str) -> StoreResult<bool> {
        self.with_tables(|t| t.boards.get(board_id).is_some_and(|r| r.board.is_some()))
    }

    async fn get_board(&self, board_id: &str) -> StoreResult<Option<Board>> {
        self.with_tables(|t| t.boards.get(board_id).and_then(|r| r.board.clone()))
    }

    async fn update_mask(&self, board_id: &str, mask: bool) -> StoreResult<()> {
        self.with_tables(|t| {
            if let Some(b) = t.board_mut(board_id) {
                b.mask = mask;
            }
        })
    }

    async fn update_lock(&self, board_id: &str, lock: bool) -> StoreResult<()> {
        self.with_tables(|t| {
            if let Some(b) = t.board_mut(board_id) {
                b.lock = lock;
            }
        })
    }

    async fn start_timer(&self, board_id: &str, seconds: u16) -> StoreResult<i64> {
        let expires = Utc::now().timestamp() + i64::from(seconds);
        self.with_tables(|t| {
            if let Some(b) = t.board_mut(board_id) {
                b.timer_expires_at_utc = expires;
            }
            expires
        })
    }

    async fn stop_timer(&self, board_id: &str) -> StoreResult<()> {
        let expires = Utc::now().timestamp() - 1;
        self.with_tables(|t| {
            if let Some(b) = t.board_mut(board_id) {
                b.timer_expires_at_utc = expires;
            }
        })
    }

    async fn delete_all(&self, board_id: &str) -> StoreResult<()> {
        self.with_tables(|t| t.purge(board_id))
    }

    async fn get_columns(&self, board_id: &str) -> StoreResult<Vec<BoardColumn>> {
        self.with_tables(|t| {
            let mut cols: Vec<BoardColumn> = t
                .boards
                .get(board_id)
                .map(|r| r.columns.values().cloned().collect())
                .unwrap_or_default();
            cols.sort_by_key(|c| c.position);
            cols
        })
    }

    async fn reset_columns(&self, board: &Board, _old: &[BoardColumn], new: &[BoardColumn]) -> StoreResult<()> {
        // The map is the column id set; replacing it covers delete, create and update.
        self.with_tables(|t| {
            t.record(&board.id).columns = new.iter().map(|c| (c.id.clone(), c.clone())).collect();
        })
    }

    async fn has_messages_in_columns(&self, board_id: &str, column_ids: &[String]) -> StoreResult<bool> {
        self.with_tables(|t| {
            let Some(record) = t.boards.get(board_id) else {
                return false;
            };
            record
                .message_ids
                .iter()
                .chain(record.comment_ids.iter())
                .filter_map(|id| t.messages.get(id))
                .any(|m| column_ids.contains(&m.category))
        })
    }

    async fn allocate_xid(&self, board_id: &str, user_id: &str) -> StoreResult<String> {
        self.with_tables(|t| {
            let record = t.record(board_id);
            if let Some(xid) = record.xids.get(user_id) {
                return xid.clone();
            }
            record.xid_seq += 1;
            let xid = record.xid_seq.to_string();
            record.xids.insert(user_id.to_string(), xid.clone());
            xid
        })
    }

    async fn commit_presence(&self, board_id: &str, user: &User) -> StoreResult<()> {
        self.with_tables(|t| {
            t.record(board_id).presence.insert(user.id.clone(), user.clone());
        })
    }

    async fn remove_presence(&self, board_id: &str, user_id: &str) -> StoreResult<()> {
        self.with_tables(|t| {
            if let Some(r) = t.boards.get_mut(board_id) {
                r.presence.remove(user_id);
            }
        })
    }

    async fn get_presence(&self, board_id: &str) -> StoreResult<Vec<User>> {
        self.with_tables(|t| {
            t.boards
                .get(board_id)
                .map(|r| r.presence.values().cloned().collect())
                .unwrap_or_default()
        })
    }

    async fn get_message(&self, message_id: &str) -> StoreResult<Option<Message>> {
        self.with_tables(|t| t.messages.get(message_id).cloned())
    }

    async fn get_messages(&self, board_id: &str) -> StoreResult<Vec<Message>> {
        self.with_tables(|t| match t.boards.get(board_id) {
            Some(r) => t.collect(&r.message_ids),
            None => Vec::new(),
        })
    }

    async fn get_comments(&self, board_id: &str) -> StoreResult<Vec<Message>> {
        self.with_tables(|t| match t.boards.get(board_id) {
            Some(r) => t.collect(&r.comment_ids),
            None => Vec::new(),
        })
    }

    async fn get_messages_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Message>> {
        self.with_tables(|t| ids.iter().filter_map(|id| t.messages.get(id).cloned()).collect())
    }

    async fn save_message(&self, message: &Message, mode: SaveMode) -> StoreResult<()> {
        self.with_tables(|t| {
            t.messages.insert(message.id.clone(), message.clone());
            match mode {
                SaveMode::Update => {}
                SaveMode::NewMessage => {
                    t.record(&message.board_id).message_ids.insert(message.id.clone());
                }
                SaveMode::NewComment => {
                    t.record(&message.board_id).comment_ids.insert(message.id.clone());
                }
            }
        })
    }

    async fn delete_message(&self, board_id: &str, message_id: &str, comment_ids: &[String]) -> StoreResult<()> {
        self.with_tables(|t| {
            t.messages.remove(message_id);
            t.likes.remove(message_id);
            for id in comment_ids {
                t.messages.remove(id);
            }
            if let Some(r) = t.boards.get_mut(board_id) {
                r.message_ids.remove(message_id);
                for id in comment_ids {
                    r.comment_ids.remove(id);
                }
            }
        })
    }

    async fn delete_comment(&self, board_id: &str, comment_id: &str) -> StoreResult<()> {
        self.with_tables(|t| {
            t.messages.remove(comment_id);
            if let Some(r) = t.boards.get_mut(board_id) {
                r.comment_ids.remove(comment_id);
            }
        })
    }

    async fn update_category(&self, category: &str, message_id: &str, comment_ids: &[String]) -> StoreResult<()> {
        self.with_tables(|t| {
            for id in std::iter::once(message_id).chain(comment_ids.iter().map(String::as_str)) {
                if let Some(m) = t.messages.get_mut(id) {
                    m.category = category.to_string();
                }
            }
        })
    }

    async fn toggle_like(&self, message_id: &str, user_id: &str, like: bool) -> StoreResult<bool> {
        self.with_tables(|t| {
            let set = t.likes.entry(message_id.to_string()).or_default();
            if like {
                set.insert(user_id.to_string())
            } else {
                set.remove(user_id)
            }
        })
    }

    async fn likers(&self, message_id: &str) -> StoreResult<HashSet<String>> {
        self.with_tables(|t| t.likes.get(message_id).cloned().unwrap_or_default())
    }

    async fn likes_info(&self, user_id: &str, message_ids: &[String]) -> StoreResult<HashMap<String, LikeInfo>> {
        self.with_tables(|t| {
            message_ids
                .iter()
                .map(|id| {
                    let info = t
                        .likes
                        .get(id)
                        .map(|set| LikeInfo {
                            count: set.len() as i64,
                            liked: set.contains(user_id),
                        })
                        .unwrap_or_default();
                    (id.clone(), info)
                })
                .collect()
        })
    }
}
