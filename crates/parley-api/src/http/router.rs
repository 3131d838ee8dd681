//! Axum router configuration with middleware.
//!
//! API routes live under `/api/v1/`. Middleware: CORS, tracing.
//!
//! A static web UI is served from `PARLEY_WEB_DIR` when that directory
//! exists. API routes and `/health` take priority; unknown paths fall
//! through to its `index.html`.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::send_message))
        .route("/history", get(handlers::chat::get_history))
        .route("/session", get(handlers::chat::get_session));

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Ok(web_dir) = std::env::var("PARLEY_WEB_DIR") {
        if std::path::Path::new(&web_dir).is_dir() {
            let index_path = format!("{web_dir}/index.html");
            let serve_dir = ServeDir::new(&web_dir).fallback(ServeFile::new(index_path));
            router = router.fallback_service(serve_dir);
            tracing::info!(path = %web_dir, "Static web UI enabled");
        } else {
            tracing::warn!(path = %web_dir, "PARLEY_WEB_DIR is not a directory, serving API only");
        }
    }

    router
}

/// GET /health - Liveness check.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
