//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS,
//! and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        // Students
        .route("/api/v1/students", post(http::http_register))
        .route("/api/v1/students/:id", get(http::http_get_student))
        .route("/api/v1/students/:id/dashboard", get(http::http_get_dashboard))
        .route("/api/v1/students/:id/progress", post(http::http_post_progress))
        .route("/api/v1/students/:id/achievements", post(http::http_post_achievement))
        // Adaptive practice
        .route("/api/v1/practice/sessions", post(http::http_start_practice))
        .route("/api/v1/practice/sessions/:id/answer", post(http::http_submit_answer))
        .route("/api/v1/practice/sessions/:id/hint", get(http::http_get_hint))
        .route("/api/v1/practice/sessions/:id/advance", post(http::http_advance))
        // Timed exams
        .route("/api/v1/exams", post(http::http_start_exam))
        .route("/api/v1/exams/:id", get(http::http_exam_view))
        .route("/api/v1/exams/:id/answers", post(http::http_exam_answer))
        .route("/api/v1/exams/:id/navigate", post(http::http_exam_navigate))
        .route("/api/v1/exams/:id/submit", post(http::http_exam_submit))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
