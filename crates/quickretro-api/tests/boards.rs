use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use quickretro_api::{AppStateInner, routes};
use quickretro_store::BoardStore;
use quickretro_store::memory::MemoryStore;
use quickretro_types::models::{Message, SaveMode};

fn app(store: Arc<MemoryStore>) -> Router {
    routes(Arc::new(AppStateInner {
        store,
        board_ttl: Duration::from_secs(2 * 24 * 3600),
    }))
}

fn columns(n: usize) -> Value {
    (0..n)
        .map(|i| json!({ "id": format!("col{i}"), "text": format!("Column {i}"), "isDefault": i == 0, "color": "red", "pos": i + 1 }))
        .collect()
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn create(body: Value) -> Request<Body> {
    Request::post("/api/board/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn create_then_lookup() {
    let store = Arc::new(MemoryStore::new());
    let (status, body) = call(
        app(store.clone()),
        create(json!({ "name": "Sprint 12", "team": "Core", "owner": "u1", "columns": columns(3) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();

    let board = store.get_board(&id).await.unwrap().unwrap();
    assert!(board.mask);
    assert!(!board.lock);
    assert!(board.auto_delete_at_utc > board.created_at_utc);
    assert_eq!(store.get_columns(&id).await.unwrap().len(), 3);

    let (status, body) = call(app(store.clone()), get(&format!("/api/board/{id}/user/u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": id, "name": "Sprint 12", "isOwner": true }));

    let (_, body) = call(app(store), get(&format!("/api/board/{id}/user/u2"))).await;
    assert_eq!(body["isOwner"], false);
}

#[tokio::test]
async fn create_rejects_bad_column_sets() {
    let store = Arc::new(MemoryStore::new());
    for cols in [columns(0), columns(6)] {
        let (status, _) = call(
            app(store.clone()),
            create(json!({ "name": "x", "owner": "u1", "columns": cols })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let long_name = "n".repeat(81);
    let (status, _) = call(
        app(store),
        create(json!({ "name": long_name, "owner": "u1", "columns": columns(1) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_board_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let (status, _) = call(app(store), get("/api/board/nope/user/u1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_personalizes_messages() {
    let store = Arc::new(MemoryStore::new());
    let (_, body) = call(
        app(store.clone()),
        create(json!({ "name": "Retro", "owner": "u1", "columns": columns(2) })),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    let message = Message {
        id: "m1".into(),
        author_id: "u2".into(),
        author_xid: "2".into(),
        author_nickname: "Bob".into(),
        board_id: id.clone(),
        content: "hello".into(),
        category: "col0".into(),
        anonymous: false,
        parent_id: String::new(),
    };
    store.save_message(&message, SaveMode::NewMessage).await.unwrap();
    store.toggle_like("m1", "u1", true).await.unwrap();

    let (status, body) = call(app(store.clone()), get(&format!("/api/board/{id}/user/u1/refresh"))).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["likes"], 1);
    assert_eq!(list[0]["liked"], true);
    assert_eq!(list[0]["mine"], false);

    let (_, body) = call(app(store), get(&format!("/api/board/{id}/user/u2/refresh"))).await;
    assert_eq!(body[0]["mine"], true);
    assert_eq!(body[0]["liked"], false);
}
