use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use quickretro_types::models::{Board, BoardColumn, LikeInfo, Message, SaveMode, User};

use crate::error::StoreResult;

/// Durable board state. Every record of a board expires with it; the absence
/// of the board record is the only existence check callers rely on.
#[async_trait]
pub trait BoardStore: Send + Sync {
    // -- Boards --

    async fn create_board(&self, board: &Board, columns: &[BoardColumn]) -> StoreResult<()>;

    async fn board_exists(&self, board_id: &str) -> StoreResult<bool>;

    async fn get_board(&self, board_id: &str) -> StoreResult<Option<Board>>;

    async fn update_mask(&self, board_id: &str, mask: bool) -> StoreResult<()>;

    async fn update_lock(&self, board_id: &str, lock: bool) -> StoreResult<()>;

    /// Set the timer to expire `seconds` from now. Returns the new expiry.
    async fn start_timer(&self, board_id: &str, seconds: u16) -> StoreResult<i64>;

    /// Move the expiry one second into the past so every reader sees zero.
    async fn stop_timer(&self, board_id: &str) -> StoreResult<()>;

    /// Remove the board and every record under it.
    async fn delete_all(&self, board_id: &str) -> StoreResult<()>;

    // -- Columns --

    async fn get_columns(&self, board_id: &str) -> StoreResult<Vec<BoardColumn>>;

    /// Diff `old` against `new`: drop removed columns, create added ones,
    /// update changed fields and rebuild the board's column id set.
    async fn reset_columns(&self, board: &Board, old: &[BoardColumn], new: &[BoardColumn]) -> StoreResult<()>;

    /// True if any message or comment of the board is filed under one of `column_ids`.
    async fn has_messages_in_columns(&self, board_id: &str, column_ids: &[String]) -> StoreResult<bool>;

    // -- Presence --

    /// Return the user's external id on this board, allocating the next
    /// sequential one on first use.
    async fn allocate_xid(&self, board_id: &str, user_id: &str) -> StoreResult<String>;

    async fn commit_presence(&self, board_id: &str, user: &User) -> StoreResult<()>;

    async fn remove_presence(&self, board_id: &str, user_id: &str) -> StoreResult<()>;

    async fn get_presence(&self, board_id: &str) -> StoreResult<Vec<User>>;

    // -- Messages --

    async fn get_message(&self, message_id: &str) -> StoreResult<Option<Message>>;

    /// Top-level messages of a board.
    async fn get_messages(&self, board_id: &str) -> StoreResult<Vec<Message>>;

    async fn get_comments(&self, board_id: &str) -> StoreResult<Vec<Message>>;

    /// Fetch several records in one round trip. Missing ids are skipped.
    async fn get_messages_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Message>>;

    async fn save_message(&self, message: &Message, mode: SaveMode) -> StoreResult<()>;

    /// Delete a top-level message, its likes, and exactly the listed comments.
    async fn delete_message(&self, board_id: &str, message_id: &str, comment_ids: &[String]) -> StoreResult<()>;

    async fn delete_comment(&self, board_id: &str, comment_id: &str) -> StoreResult<()>;

    async fn update_category(&self, category: &str, message_id: &str, comment_ids: &[String]) -> StoreResult<()>;

    // -- Likes --

    /// Add or remove `user_id` from the message's like set. Returns false when
    /// membership did not change.
    async fn toggle_like(&self, message_id: &str, user_id: &str, like: bool) -> StoreResult<bool>;

    async fn likers(&self, message_id: &str) -> StoreResult<HashSet<String>>;

    /// Like count and the user's own like for each id, in one round trip.
    async fn likes_info(&self, user_id: &str, message_ids: &[String]) -> StoreResult<HashMap<String, LikeInfo>>;
}
