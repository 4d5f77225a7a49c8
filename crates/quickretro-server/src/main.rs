mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use quickretro_api::AppStateInner;
use quickretro_gateway::{Hub, HubSettings, connection};
use quickretro_store::memory::{MemoryBus, MemoryStore};
use quickretro_store::redis_store::{RedisBridge, RedisStore};
use quickretro_store::{BoardStore, Bridge, Delivery};
use quickretro_types::limits::valid_id;

use crate::config::Config;

#[derive(Clone)]
struct ServerState {
    hub: Hub,
    max_message_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickretro=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Store and bridge
    let (store, bridge, deliveries) = backends(&config).await?;

    let hub = Hub::start(
        store.clone(),
        bridge,
        deliveries,
        HubSettings {
            typing_enabled: config.typing_enabled,
            ..HubSettings::default()
        },
    );

    // Routes
    let api_routes = quickretro_api::routes(Arc::new(AppStateInner {
        store,
        board_ttl: config.board_ttl,
    }));

    let ws_route = Router::new()
        .route("/ws/board/{board}/user/{user}/meet", get(ws_upgrade))
        .with_state(ServerState {
            hub,
            max_message_size: config.max_message_size,
        });

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::permissive().allow_origin(AllowOrigin::list(config.allowed_origins.clone()))
    };

    let app = Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("QuickRetro server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

type Backends = (
    Arc<dyn BoardStore>,
    Arc<dyn Bridge>,
    mpsc::UnboundedReceiver<Delivery>,
);

async fn backends(config: &Config) -> anyhow::Result<Backends> {
    match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let store: Arc<dyn BoardStore> = Arc::new(RedisStore::connect(&client, config.board_ttl).await?);
            let (bridge, deliveries) = RedisBridge::connect(&client).await?;
            let bridge: Arc<dyn Bridge> = Arc::new(bridge);
            Ok((store, bridge, deliveries))
        }
        None => {
            warn!("QUICKRETRO_REDIS_URL not set, boards live in process memory");
            let store: Arc<dyn BoardStore> = Arc::new(MemoryStore::new());
            let (bridge, deliveries) = MemoryBus::new().attach();
            let bridge: Arc<dyn Bridge> = Arc::new(bridge);
            Ok((store, bridge, deliveries))
        }
    }
}

async fn ws_upgrade(
    State(state): State<ServerState>,
    Path((board, user)): Path<(String, String)>,
    ws: WebSocketUpgrade,
) -> Response {
    if !valid_id(&board) || !valid_id(&user) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    ws.max_message_size(state.max_message_size)
        .max_frame_size(state.max_message_size)
        .on_upgrade(move |socket| connection::serve(socket, state.hub, board, user))
        .into_response()
}
