//! Router assembly: public auth endpoints, token-protected API, static
//! frontend, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::require_auth;
use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - `/api/register`, `/api/login`, `/api/token/refresh`, `/api/health` (public)
/// - topic listing, generation and submission endpoints (bearer access token)
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    let public = Router::new()
        .route("/api/health", get(http::http_health))
        .route("/api/register", post(http::http_register))
        .route("/api/login", post(http::http_login))
        .route("/api/token/refresh", post(http::http_refresh));

    let protected = Router::new()
        .route("/api/reading-tasks", get(http::http_list_reading_tasks))
        .route("/api/speaking-tasks", get(http::http_list_speaking_tasks))
        .route("/api/reading-task/:id/generate", get(http::http_generate_reading))
        .route("/api/speaking-task/:id/generate", get(http::http_generate_speaking))
        .route("/api/reading/submit", post(http::http_submit_reading))
        .route(
            "/api/speaking-task/:id/submit",
            post(http::http_submit_speaking).layer(DefaultBodyLimit::max(state.max_audio_bytes)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
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
