use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::{info, warn};

use quickretro_types::models::{Board, BoardColumn, LikeInfo, Message, SaveMode, User};

use super::codec::{self, Fields};
use crate::error::StoreResult;
use crate::keys;
use crate::store::BoardStore;

/// Store backed by Redis hashes and sets. See [`crate::keys`] for the layout.
///
/// Board-scoped keys expire with the board at `autoDeleteAtUtc`; message,
/// like and presence keys get the configured TTL on every write.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    ttl_secs: i64,
}

impl RedisStore {
    pub fn new(conn: MultiplexedConnection, ttl: Duration) -> Self {
        Self {
            conn,
            ttl_secs: ttl.as_secs() as i64,
        }
    }

    pub async fn connect(client: &redis::Client, ttl: Duration) -> StoreResult<Self> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Connected to Redis store");
        Ok(Self::new(conn, ttl))
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }

    async fn hashes(&self, keys: &[String]) -> StoreResult<Vec<(String, Fields)>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.hgetall(key);
        }
        let maps: Vec<Fields> = pipe.query_async(&mut self.conn()).await?;
        Ok(keys.iter().cloned().zip(maps).collect())
    }

    async fn messages_in(&self, set_key: &str) -> StoreResult<Vec<Message>> {
        let ids: Vec<String> = self.conn().smembers(set_key).await?;
        self.get_messages_by_ids(&ids).await
    }
}

#[async_trait]
impl BoardStore for RedisStore {
    async fn create_board(&self, board: &Board, columns: &[BoardColumn]) -> StoreResult<()> {
        let key = keys::board(&board.id);
        let cols_key = keys::board_columns(&board.id);
        let expires = board.auto_delete_at_utc;

        let mut pipe = redis::pipe();
        pipe.hset_multiple(&key, &codec::board_fields(board)).ignore();
        for col in columns {
            let col_key = keys::board_column(&board.id, &col.id);
            pipe.hset_multiple(&col_key, &codec::column_fields(col))
                .ignore()
                .expire_at(&col_key, expires)
                .ignore()
                .sadd(&cols_key, &col.id)
                .ignore();
        }
        pipe.expire_at(&cols_key, expires).ignore();
        pipe.expire_at(&key, expires).ignore();

        let _: () = pipe.query_async(&mut self.conn()).await?;
        Ok(())
    }

    async fn board_exists(&self, board_id: &str) -> StoreResult<bool> {
        let exists: bool = self.conn().exists(keys::board(board_id)).await?;
        Ok(exists)
    }

    async fn get_board(&self, board_id: &str) -> StoreResult<Option<Board>> {
        let key = keys::board(board_id);
        let fields: Fields = self.conn().hgetall(&key).await?;
        codec::board_from(&key, &fields)
    }

    async fn update_mask(&self, board_id: &str, mask: bool) -> StoreResult<()> {
        let _: () = self.conn().hset(keys::board(board_id), "mask", codec::flag(mask)).await?;
        Ok(())
    }

    async fn update_lock(&self, board_id: &str, lock: bool) -> StoreResult<()> {
        let _: () = self.conn().hset(keys::board(board_id), "lock", codec::flag(lock)).await?;
        Ok(())
    }

    async fn start_timer(&self, board_id: &str, seconds: u16) -> StoreResult<i64> {
        let expires = Utc::now().timestamp() + i64::from(seconds);
        let _: () = self.conn().hset(keys::board(board_id), "timerExpiresAtUtc", expires).await?;
        Ok(expires)
    }

    async fn stop_timer(&self, board_id: &str) -> StoreResult<()> {
        let expires = Utc::now().timestamp() - 1;
        let _: () = self.conn().hset(keys::board(board_id), "timerExpiresAtUtc", expires).await?;
        Ok(())
    }

    async fn delete_all(&self, board_id: &str) -> StoreResult<()> {
        let msgs_key = keys::board_messages(board_id);
        let cmts_key = keys::board_comments(board_id);
        let users_key = keys::board_presence(board_id);
        let cols_key = keys::board_columns(board_id);

        let (message_ids, comment_ids, user_ids, column_ids): (Vec<String>, Vec<String>, Vec<String>, Vec<String>) =
            redis::pipe()
                .smembers(&msgs_key)
                .smembers(&cmts_key)
                .smembers(&users_key)
                .smembers(&cols_key)
                .query_async(&mut self.conn())
                .await?;

        let mut pipe = redis::pipe();
        for id in &message_ids {
            pipe.del(vec![keys::message(id), keys::message_likes(id)]).ignore();
        }
        for id in &comment_ids {
            pipe.del(keys::message(id)).ignore();
        }
        for id in &user_ids {
            pipe.del(keys::board_user(board_id, id)).ignore();
        }
        for id in &column_ids {
            pipe.del(keys::board_column(board_id, id)).ignore();
        }
        pipe.del(vec![
            msgs_key,
            cmts_key,
            users_key,
            cols_key,
            keys::board_xids(board_id),
            keys::board_xid_seq(board_id),
            keys::board(board_id),
        ])
        .ignore();

        let _: () = pipe.query_async(&mut self.conn()).await?;
        Ok(())
    }

    async fn get_columns(&self, board_id: &str) -> StoreResult<Vec<BoardColumn>> {
        let ids: Vec<String> = self.conn().smembers(keys::board_columns(board_id)).await?;
        let col_keys: Vec<String> = ids.iter().map(|id| keys::board_column(board_id, id)).collect();

        let mut cols = Vec::with_capacity(col_keys.len());
        for (key, fields) in self.hashes(&col_keys).await? {
            match codec::column_from(&key, &fields) {
                Ok(Some(col)) => cols.push(col),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Skipping unreadable column"),
            }
        }
        cols.sort_by_key(|c| c.position);
        Ok(cols)
    }

    async fn reset_columns(&self, board: &Board, old: &[BoardColumn], new: &[BoardColumn]) -> StoreResult<()> {
        let cols_key = keys::board_columns(&board.id);
        let expires = board.auto_delete_at_utc;
        let old_by_id: HashMap<&str, &BoardColumn> = old.iter().map(|c| (c.id.as_str(), c)).collect();
        let new_ids: HashSet<&str> = new.iter().map(|c| c.id.as_str()).collect();

        let mut pipe = redis::pipe();
        for id in old_by_id.keys().filter(|id| !new_ids.contains(*id)) {
            pipe.del(keys::board_column(&board.id, id)).ignore();
        }
        for col in new {
            let col_key = keys::board_column(&board.id, &col.id);
            let Some(prev) = old_by_id.get(col.id.as_str()) else {
                pipe.hset_multiple(&col_key, &codec::column_fields(col))
                    .ignore()
                    .expire_at(&col_key, expires)
                    .ignore();
                continue;
            };
            if prev.text != col.text {
                pipe.hset(&col_key, "text", &col.text).ignore();
            }
            if prev.color != col.color {
                pipe.hset(&col_key, "color", &col.color).ignore();
            }
            if prev.is_default != col.is_default {
                pipe.hset(&col_key, "isDefault", codec::flag(col.is_default)).ignore();
            }
            if prev.position != col.position {
                pipe.hset(&col_key, "pos", col.position).ignore();
            }
        }
        pipe.del(&cols_key).ignore();
        for col in new {
            pipe.sadd(&cols_key, &col.id).ignore();
        }
        pipe.expire_at(&cols_key, expires).ignore();

        let _: () = pipe.query_async(&mut self.conn()).await?;
        Ok(())
    }

    async fn has_messages_in_columns(&self, board_id: &str, column_ids: &[String]) -> StoreResult<bool> {
        if column_ids.is_empty() {
            return Ok(false);
        }
        let mut all = self.get_messages(board_id).await?;
        all.extend(self.get_comments(board_id).await?);
        Ok(all.iter().any(|m| column_ids.contains(&m.category)))
    }

    async fn allocate_xid(&self, board_id: &str, user_id: &str) -> StoreResult<String> {
        let xids_key = keys::board_xids(board_id);
        let seq_key = keys::board_xid_seq(board_id);
        let mut conn = self.conn();

        if let Some(xid) = conn.hget::<_, _, Option<String>>(&xids_key, user_id).await? {
            return Ok(xid);
        }

        let next: i64 = conn.incr(&seq_key, 1_i64).await?;
        let claimed: bool = conn.hset_nx(&xids_key, user_id, next).await?;
        let _: () = redis::pipe()
            .expire(&xids_key, self.ttl_secs)
            .ignore()
            .expire(&seq_key, self.ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await?;
        if claimed {
            return Ok(next.to_string());
        }
        // Another process registered the same user first.
        let xid: String = conn.hget(&xids_key, user_id).await?;
        Ok(xid)
    }

    async fn commit_presence(&self, board_id: &str, user: &User) -> StoreResult<()> {
        let user_key = keys::board_user(board_id, &user.id);
        let users_key = keys::board_presence(board_id);
        let _: () = redis::pipe()
            .hset_multiple(&user_key, &codec::user_fields(user))
            .ignore()
            .sadd(&users_key, &user.id)
            .ignore()
            .expire(&user_key, self.ttl_secs)
            .ignore()
            .expire(&users_key, self.ttl_secs)
            .ignore()
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn remove_presence(&self, board_id: &str, user_id: &str) -> StoreResult<()> {
        let _: () = redis::pipe()
            .del(keys::board_user(board_id, user_id))
            .ignore()
            .srem(keys::board_presence(board_id), user_id)
            .ignore()
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn get_presence(&self, board_id: &str) -> StoreResult<Vec<User>> {
        let ids: Vec<String> = self.conn().smembers(keys::board_presence(board_id)).await?;
        let user_keys: Vec<String> = ids.iter().map(|id| keys::board_user(board_id, id)).collect();
        Ok(self
            .hashes(&user_keys)
            .await?
            .iter()
            .filter_map(|(key, fields)| codec::user_from(key, fields))
            .collect())
    }

    async fn get_message(&self, message_id: &str) -> StoreResult<Option<Message>> {
        let key = keys::message(message_id);
        let fields: Fields = self.conn().hgetall(&key).await?;
        codec::message_from(&key, &fields)
    }

    async fn get_messages(&self, board_id: &str) -> StoreResult<Vec<Message>> {
        self.messages_in(&keys::board_messages(board_id)).await
    }

    async fn get_comments(&self, board_id: &str) -> StoreResult<Vec<Message>> {
        self.messages_in(&keys::board_comments(board_id)).await
    }

    async fn get_messages_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Message>> {
        let msg_keys: Vec<String> = ids.iter().map(|id| keys::message(id)).collect();
        let mut messages = Vec::with_capacity(msg_keys.len());
        for (key, fields) in self.hashes(&msg_keys).await? {
            match codec::message_from(&key, &fields) {
                Ok(Some(m)) => messages.push(m),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Skipping unreadable message"),
            }
        }
        Ok(messages)
    }

    async fn save_message(&self, message: &Message, mode: SaveMode) -> StoreResult<()> {
        let key = keys::message(&message.id);
        let mut pipe = redis::pipe();
        pipe.hset_multiple(&key, &codec::message_fields(message))
            .ignore()
            .expire(&key, self.ttl_secs)
            .ignore();

        let index = match mode {
            SaveMode::Update => None,
            SaveMode::NewMessage => Some(keys::board_messages(&message.board_id)),
            SaveMode::NewComment => Some(keys::board_comments(&message.board_id)),
        };
        if let Some(set_key) = index {
            pipe.sadd(&set_key, &message.id)
                .ignore()
                .expire(&set_key, self.ttl_secs)
                .ignore();
        }

        let _: () = pipe.query_async(&mut self.conn()).await?;
        Ok(())
    }

    async fn delete_message(&self, board_id: &str, message_id: &str, comment_ids: &[String]) -> StoreResult<()> {
        let cmts_key = keys::board_comments(board_id);
        let mut pipe = redis::pipe();
        pipe.del(vec![keys::message(message_id), keys::message_likes(message_id)])
            .ignore()
            .srem(keys::board_messages(board_id), message_id)
            .ignore();
        for id in comment_ids {
            pipe.del(keys::message(id)).ignore().srem(&cmts_key, id).ignore();
        }
        let _: () = pipe.query_async(&mut self.conn()).await?;
        Ok(())
    }

    async fn delete_comment(&self, board_id: &str, comment_id: &str) -> StoreResult<()> {
        let _: () = redis::pipe()
            .del(keys::message(comment_id))
            .ignore()
            .srem(keys::board_comments(board_id), comment_id)
            .ignore()
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn update_category(&self, category: &str, message_id: &str, comment_ids: &[String]) -> StoreResult<()> {
        let mut pipe = redis::pipe();
        pipe.hset(keys::message(message_id), "category", category).ignore();
        for id in comment_ids {
            pipe.hset(keys::message(id), "category", category).ignore();
        }
        let _: () = pipe.query_async(&mut self.conn()).await?;
        Ok(())
    }

    async fn toggle_like(&self, message_id: &str, user_id: &str, like: bool) -> StoreResult<bool> {
        let key = keys::message_likes(message_id);
        let mut conn = self.conn();
        let affected: i64 = if like {
            let (affected,): (i64,) = redis::pipe()
                .sadd(&key, user_id)
                .expire(&key, self.ttl_secs)
                .ignore()
                .query_async(&mut conn)
                .await?;
            affected
        } else {
            conn.srem(&key, user_id).await?
        };
        Ok(affected > 0)
    }

    async fn likers(&self, message_id: &str) -> StoreResult<HashSet<String>> {
        let members: HashSet<String> = self.conn().smembers(keys::message_likes(message_id)).await?;
        Ok(members)
    }

    async fn likes_info(&self, user_id: &str, message_ids: &[String]) -> StoreResult<HashMap<String, LikeInfo>> {
        if message_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut pipe = redis::pipe();
        for id in message_ids {
            let key = keys::message_likes(id);
            pipe.scard(&key).sismember(&key, user_id);
        }
        // SCARD and SISMEMBER both reply with integers; read them as flat pairs.
        let replies: Vec<i64> = pipe.query_async(&mut self.conn()).await?;
        Ok(message_ids
            .iter()
            .cloned()
            .zip(replies.chunks(2).map(|pair| LikeInfo {
                count: pair.first().copied().unwrap_or(0),
                liked: pair.get(1).copied().unwrap_or(0) == 1,
            }))
            .collect())
    }
}
