use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::SearchError;
use crate::models::{parse_limit, SearchMode, SearchResponse};
use crate::state::AppState;

/// Raw query-string parameters. Everything is optional text so that
/// validation errors can be reported in the JSON error shape.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub mode: Option<String>,
    pub limit: Option<String>,
    /// Comma-separated entity types
    pub types: Option<String>,
}

/// GET /search?q=&mode=&limit=&types=
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<Value>)> {
    let mode = match params.mode.as_deref() {
        None | Some("") => SearchMode::default(),
        Some(raw) => SearchMode::parse(raw).ok_or_else(|| {
            error_response(SearchError::InvalidParameter(format!(
                "Invalid search mode '{raw}'"
            )))
        })?,
    };

    let limit = params
        .limit
        .as_deref()
        .and_then(parse_limit)
        .unwrap_or(state.config.search.default_limit);

    let types: Option<Vec<&str>> = params
        .types
        .as_deref()
        .map(|raw| raw.split(',').collect());

    let text = params.q.as_deref().unwrap_or_default();
    let response = state
        .orchestrator
        .execute(text, mode, limit, types.as_deref())
        .await
        .map_err(error_response)?;

    tracing::info!(
        "Search '{}' ({}) returned {} results",
        response.query,
        response.mode.as_str(),
        response.total_results
    );
    Ok(Json(response))
}

fn error_response(err: SearchError) -> (StatusCode, Json<Value>) {
    match err {
        SearchError::MissingQuery => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Query parameter 'q' is required", "results": [] })),
        ),
        SearchError::InvalidParameter(message) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": message, "results": [] })),
        ),
        other => {
            tracing::error!("Search failed: {other:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Search failed",
                    "message": other.to_string(),
                    "results": [],
                })),
            )
        }
    }
}
