use std::sync::Arc;
use std::time::Duration;

use quickretro_store::BoardStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<dyn BoardStore>,
    /// Lifetime of a new board before the store purges it.
    pub board_ttl: Duration,
}
