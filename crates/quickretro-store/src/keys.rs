//! Key layout.
//!
//! ```text
//! board:{boardId}                 hash   board record
//! board:col:{boardId}             set    column ids
//! board:col:{boardId}:{colId}     hash   column record
//! board:msg:{boardId}             set    top-level message ids
//! board:cmts:{boardId}            set    comment ids
//! board:users:{boardId}           set    connected user ids
//! board:user:{boardId}:{userId}   hash   user presence record
//! board:user:xid:{boardId}        hash   user id -> external id
//! board:user:xid:seq:{boardId}    int    last allocated external id
//! msg:{messageId}                 hash   message or comment record
//! msg:likes:{messageId}           set    user ids that liked the message
//! ```

pub fn board(board_id: &str) -> String {
    format!("board:{board_id}")
}

pub fn board_columns(board_id: &str) -> String {
    format!("board:col:{board_id}")
}

pub fn board_column(board_id: &str, column_id: &str) -> String {
    format!("board:col:{board_id}:{column_id}")
}

pub fn board_messages(board_id: &str) -> String {
    format!("board:msg:{board_id}")
}

pub fn board_comments(board_id: &str) -> String {
    format!("board:cmts:{board_id}")
}

pub fn board_presence(board_id: &str) -> String {
    format!("board:users:{board_id}")
}

pub fn board_user(board_id: &str, user_id: &str) -> String {
    format!("board:user:{board_id}:{user_id}")
}

pub fn board_xids(board_id: &str) -> String {
    format!("board:user:xid:{board_id}")
}

pub fn board_xid_seq(board_id: &str) -> String {
    format!("board:user:xid:seq:{board_id}")
}

pub fn message(message_id: &str) -> String {
    format!("msg:{message_id}")
}

pub fn message_likes(message_id: &str) -> String {
    format!("msg:likes:{message_id}")
}
