//! Optional HTTP control API.  Reads come straight from the `SearchStore`;
//! writes go through the `SearchHandle` like every keypress does.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use finder_proto::protocol::ChannelSnapshot;
use finder_proto::state::SearchStore;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::core::SearchHandle;

#[derive(Clone)]
struct HttpState {
    store: SearchStore,
    handle: SearchHandle,
}

pub fn router(store: SearchStore, handle: SearchHandle) -> Router {
    Router::new()
        .route("/api/channels", get(list_channels))
        .route("/api/channels/:name", get(get_channel))
        .route("/api/channels/:name/page/:offset", get(request_page).post(request_page))
        .route("/api/channels/:name/next", get(next_page).post(next_page))
        .route("/api/channels/:name/prev", get(prev_page).post(prev_page))
        .route("/api/query", get(clear_query).post(clear_query))
        .route("/api/query/:query", get(set_query).post(set_query))
        .layer(CorsLayer::permissive())
        .with_state(HttpState { store, handle })
}

pub fn start_server(
    bind_address: String,
    port: u16,
    store: SearchStore,
    handle: SearchHandle,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(store, handle);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn list_channels(State(state): State<HttpState>) -> Json<Vec<ChannelSnapshot>> {
    Json(state.store.all().await)
}

async fn get_channel(
    State(state): State<HttpState>,
    Path(name): Path<String>,
) -> Result<Json<ChannelSnapshot>, StatusCode> {
    state.store.get(&name).await.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn set_query(State(state): State<HttpState>, Path(query): Path<String>) -> StatusCode {
    info!("HTTP API: query {:?}", query);
    accepted(state.handle.on_query_changed(&query).await)
}

async fn clear_query(State(state): State<HttpState>) -> StatusCode {
    info!("HTTP API: clear query");
    accepted(state.handle.on_query_changed("").await)
}

async fn request_page(
    State(state): State<HttpState>,
    Path((name, offset)): Path<(String, u32)>,
) -> StatusCode {
    if state.store.get(&name).await.is_none() {
        return StatusCode::NOT_FOUND;
    }
    info!("HTTP API: {} page at {}", name, offset);
    accepted(state.handle.request_page(&name, offset).await)
}

async fn next_page(State(state): State<HttpState>, Path(name): Path<String>) -> StatusCode {
    if state.store.get(&name).await.is_none() {
        return StatusCode::NOT_FOUND;
    }
    accepted(state.handle.next_page(&name).await)
}

async fn prev_page(State(state): State<HttpState>, Path(name): Path<String>) -> StatusCode {
    if state.store.get(&name).await.is_none() {
        return StatusCode::NOT_FOUND;
    }
    accepted(state.handle.prev_page(&name).await)
}

fn accepted(sent: anyhow::Result<()>) -> StatusCode {
    match sent {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            error!("HTTP API: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SearchCore;
    use crate::dispatch::tests::{page, ManualSource};
    use crate::sources::SearchSource;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use finder_proto::config::{ChannelConfig, SearchConfig};
    use finder_proto::protocol::ChannelKind;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{broadcast, mpsc};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<ManualSource>) {
        let source = Arc::new(ManualSource::default());
        let (broadcast_tx, _) = broadcast::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);
        let (core, handle) = SearchCore::new(
            &SearchConfig::default(),
            vec![(
                ChannelConfig::new("programs", ChannelKind::Programs, "http://p"),
                source.clone() as Arc<dyn SearchSource>,
            )],
            broadcast_tx,
            event_tx,
        );
        let store = core.store();
        tokio::spawn(core.run(event_rx));
        (router(store, handle), source)
    }

    async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_list_and_get_channels() {
        let (app, _) = app();

        let (status, body) = call(&app, Method::GET, "/api/channels").await;
        assert_eq!(status, StatusCode::OK);
        let all: Vec<ChannelSnapshot> = serde_json::from_slice(&body).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "programs");

        let (status, _) = call(&app, Method::GET, "/api/channels/programs").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::GET, "/api/channels/weather").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_route_feeds_the_debouncer() {
        let (app, source) = app();

        let (status, _) = call(&app, Method::POST, "/api/query/physics").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls.lock().unwrap().clone(), vec![("physics".to_string(), 0)]);

        source.complete(0, Ok(page("Physics BS")));
        tokio::time::sleep(Duration::from_secs(1)).await;
        let (_, body) = call(&app, Method::GET, "/api/channels/programs").await;
        let snap: ChannelSnapshot = serde_json::from_slice(&body).unwrap();
        assert_eq!(snap.query.as_deref(), Some("physics"));
        assert_eq!(snap.result.unwrap().items[0].title, "Physics BS");
    }

    #[tokio::test]
    async fn test_paging_unknown_channel_is_not_found() {
        let (app, _) = app();
        let (status, _) = call(&app, Method::POST, "/api/channels/weather/page/10").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::GET, "/api/channels/weather/next").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::GET, "/api/channels/programs/prev").await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
}
