pub mod boards;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

pub use state::{AppState, AppStateInner};

/// REST routes for board creation and lookup.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/board/create", post(boards::create_board))
        .route("/api/board/{id}/user/{user}", get(boards::get_board))
        .route("/api/board/{id}/user/{user}/refresh", get(boards::refresh))
        .with_state(state)
}
