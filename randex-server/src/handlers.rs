use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use randex_core::{sample, sample_one};

use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssetParams {
    pub category: Option<String>,
    /// Parsed by hand so a non-numeric value gets its own error message.
    pub count: Option<String>,
    #[serde(rename = "type")]
    pub response_type: Option<String>,
}

/// `GET /api/assets` — random assets from one category.
///
/// `type=json` answers with the `{code, data}` envelope; `type=file`
/// redirects (303) to the first resolved asset. Logical failures keep
/// HTTP 200 and set `code: 0`.
pub async fn random_assets_handler(
    State(state): State<AppState>,
    Query(params): Query<AssetParams>,
) -> ApiResult<Response> {
    let category = params.category.as_deref().unwrap_or_default();
    if category.is_empty() {
        return Err(ApiError::new("category parameter is required"));
    }

    let count = match params.count.as_deref() {
        None => 1,
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ApiError::new("count must be a number"))?
            .max(0) as u64,
    };

    match params.response_type.as_deref().unwrap_or("json") {
        "json" => {
            let sampled = sample(&state.index, &state.store, category, count).await?;
            let data: Vec<Value> = sampled
                .into_iter()
                .map(|path| {
                    let url = path
                        .and_then(|path| {
                            let url = state.asset_url(&path);
                            if url.is_none() {
                                warn!(path = %path.display(), "indexed path outside asset root");
                            }
                            url
                        })
                        .unwrap_or_default();
                    json!({ "url": url })
                })
                .collect();

            Ok(Json(json!({ "code": 1, "data": data })).into_response())
        }
        "file" => {
            // Count is still validated, but a redirect only ever targets one
            // asset.
            let path = sample_one(&state.index, &state.store, category, count)
                .await?
                .ok_or_else(|| ApiError::new("asset could not be resolved"))?;
            let url = state
                .asset_url(&path)
                .ok_or_else(|| ApiError::new("asset could not be resolved"))?;

            Ok(Redirect::to(&url).into_response())
        }
        other => Err(ApiError::new(format!("unknown response type: {other}"))),
    }
}

/// `GET /api/categories` — names of every indexed category.
pub async fn list_categories_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "code": 1, "data": state.index.categories().await }))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
