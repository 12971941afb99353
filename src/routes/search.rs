use crate::models::responses::{ApiResponse, SearchResult};
use crate::services::catalog::{cover_url, CoverSize};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use tracing::info;

const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

pub async fn search_books(
    Query(params): Query<SearchParams>,
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Vec<SearchResult>>>) {
    let Some(query) = params.q.filter(|q| !q.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err("Search query is required")),
        );
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    info!("Catalog search: '{}' (limit {})", query, limit);
    let mut results = state.catalog.search(&query, limit).await;
    for result in &mut results {
        result.cover_url = result.cover_i.map(|id| cover_url(id, CoverSize::Medium));
    }

    (StatusCode::OK, Json(ApiResponse::ok(results)))
}
