use axum::{Router, routing::get};

use crate::handlers::{list_categories_handler, random_assets_handler};
use crate::state::AppState;

/// Create the `/api` routes.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/assets", get(random_assets_handler))
        .route("/categories", get(list_categories_handler))
}
