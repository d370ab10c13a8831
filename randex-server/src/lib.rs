//! # Randex Server
//!
//! HTTP surface over the randex asset index engine:
//!
//! - `GET /api/assets?category=<name>&count=<n>&type=json|file` — random
//!   asset URLs (JSON envelope) or a 303 redirect to one asset
//! - `GET /api/categories` — known category names
//! - `GET /assets/...` — static serving of the asset root
//! - `GET /health` — liveness probe
//!
//! The index engine itself (store, indexer, watch pipeline, sampler) lives
//! in `randex-core`; this crate wires it to axum, configuration, and
//! logging.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use state::AppState;

use axum::{Router, http::HeaderValue, routing::get};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Assemble the full application router.
pub fn create_app(state: AppState) -> Router {
    // Permissive CORS in dev or when no allow-list is configured.
    let cors_layer = if state.config.dev_mode || state.config.cors_allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    Router::new()
        .route("/health", get(handlers::health_handler))
        .nest("/api", routes::create_api_router())
        .nest_service("/assets", ServeDir::new(&state.config.asset_root))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
