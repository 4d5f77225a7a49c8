use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use quickretro_store::StoreError;
use quickretro_types::api::{CreateBoardRequest, CreateBoardResponse, GetBoardResponse};
use quickretro_types::limits::{valid_id, valid_text, validate_columns};
use quickretro_types::models::{Board, BoardStatus};
use quickretro_types::responses::MessageResponse;

use crate::state::AppState;

fn internal(e: StoreError) -> StatusCode {
    error!("Store failure in REST handler: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

pub async fn create_board(
    State(state): State<AppState>,
    Json(req): Json<CreateBoardRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if let Err(reason) = validate_columns(&req.columns) {
        warn!("Rejected board creation: {}", reason);
        return Err(StatusCode::BAD_REQUEST);
    }
    if !valid_id(&req.owner) || !valid_text(&req.name) || !valid_text(&req.team) {
        warn!("Rejected board creation: field length out of range");
        return Err(StatusCode::BAD_REQUEST);
    }

    let now = chrono::Utc::now().timestamp();
    let ttl = i64::try_from(state.board_ttl.as_secs()).unwrap_or(i64::MAX / 2);
    let board = Board {
        id: Uuid::new_v4().simple().to_string(),
        name: req.name,
        team: req.team,
        owner: req.owner,
        status: BoardStatus::InProgress,
        // New boards start masked; the owner reveals content when ready.
        mask: true,
        lock: false,
        timer_expires_at_utc: 0,
        created_at_utc: now,
        auto_delete_at_utc: now.saturating_add(ttl),
    };

    state.store.create_board(&board, &req.columns).await.map_err(internal)?;
    info!("Board {} created by {}", board.id, board.owner);

    Ok((StatusCode::CREATED, Json(CreateBoardResponse { id: board.id })))
}

pub async fn get_board(
    State(state): State<AppState>,
    Path((id, user)): Path<(String, String)>,
) -> Result<impl IntoResponse, StatusCode> {
    let board = state
        .store
        .get_board(&id)
        .await
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(GetBoardResponse {
        is_owner: board.is_owner(&user),
        id: board.id,
        name: board.name,
    }))
}

/// Top-level messages of a board, rendered for `user`.
pub async fn refresh(
    State(state): State<AppState>,
    Path((id, user)): Path<(String, String)>,
) -> Result<impl IntoResponse, StatusCode> {
    let messages = state.store.get_messages(&id).await.map_err(internal)?;
    let ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
    let likes = state.store.likes_info(&user, &ids).await.map_err(internal)?;

    let rendered: Vec<MessageResponse> = messages
        .iter()
        .map(|m| {
            let info = likes.get(&m.id).copied().unwrap_or_default();
            MessageResponse::render(m, &user, info.count, info.liked)
        })
        .collect();
    Ok(Json(rendered))
}
