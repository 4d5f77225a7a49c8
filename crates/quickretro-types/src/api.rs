use serde::{Deserialize, Serialize};

use crate::models::BoardColumn;

// -- Boards --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardRequest {
    pub name: String,
    #[serde(default)]
    pub team: String,
    pub owner: String,
    pub columns: Vec<BoardColumn>,
    /// Captcha token sent by the web client. Accepted and ignored here.
    #[serde(default)]
    pub cf_turnstile_response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBoardResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBoardResponse {
    pub id: String,
    pub name: String,
    pub is_owner: bool,
}
