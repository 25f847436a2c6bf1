//! DocChat API Gateway
//!
//! The HTTP surface of the service:
//! - `POST /api/chat` - direct streaming chat pass-through
//! - `GET  /api/health` - liveness
//! - `POST /api/upload_pdf` - build the in-memory index from a PDF
//! - `POST /api/chat_with_pdf` - retrieval-augmented chat

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use docchat_common::config::AppConfig;
use docchat_index::IndexHandle;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub index: Arc<IndexHandle>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            index: Arc::new(IndexHandle::new()),
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // The original frontend is served from another origin, so CORS is
    // wide open.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/chat", post(handlers::chat::chat))
        .route("/upload_pdf", post(handlers::pdf::upload_pdf))
        .route("/chat_with_pdf", post(handlers::pdf::chat_with_pdf));

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}
