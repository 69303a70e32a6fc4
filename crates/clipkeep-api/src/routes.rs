//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, bearer-token
//! auth and all endpoint handlers.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use clipkeep_core::error::{ClipkeepError, Result};

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Localhost origins on the served port only.
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", state.port),
        format!("http://localhost:{}", state.port),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Routes that do NOT require authentication.
    let public_routes = Router::new().route("/health", get(handlers::health));

    let protected_routes = Router::new()
        .route("/history", get(handlers::history))
        .route("/history/search", get(handlers::search_history))
        .route("/history/clear", post(handlers::clear_history))
        .route("/history/{id}", delete(handlers::delete_item))
        .route("/history/{id}/favorite", post(handlers::toggle_favorite))
        .route("/paste", post(handlers::paste))
        .route(
            "/settings",
            get(handlers::get_settings)
                .put(handlers::update_settings)
                .layer(DefaultBodyLimit::max(64 * 1024)),
        )
        .route("/capture/status", get(handlers::capture_status))
        .route("/capture/pause", post(handlers::capture_pause))
        .route("/capture/resume", post(handlers::capture_resume))
        .route("/stream", get(handlers::stream))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `127.0.0.1:<state.port>` until `shutdown` completes.
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("127.0.0.1:{}", state.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ClipkeepError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ClipkeepError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
