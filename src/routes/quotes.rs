use crate::models::responses::{ApiResponse, QuoteData};
use crate::services::quotes::{validate_quote, QuoteError};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use tracing::error;

const NO_QUOTES_ERROR: &str =
    "No authentic quotes found for this book. We only return real quotes from actual books.";
const NO_QUOTES_HINT: &str =
    "Consider checking the title and author spelling, or try a different book.";
const UPSTREAM_ERROR: &str = "Failed to fetch quotes from external sources";
const UPSTREAM_HINT: &str =
    "Please try again later or check if the book title and author are correct.";

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub title: Option<String>,
    pub author: Option<String>,
    pub count: Option<usize>,
    pub multiple: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActionParams {
    pub action: Option<String>,
}

pub async fn get_quotes(
    Query(params): Query<QuoteParams>,
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<QuoteData>>) {
    let (title, author) = match (
        params.title.filter(|t| !t.trim().is_empty()),
        params.author.filter(|a| !a.trim().is_empty()),
    ) {
        (Some(title), Some(author)) => (title, author),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::err("Both title and author parameters are required")),
            )
        }
    };

    let count = params.count.unwrap_or(1);
    if count < 1 || count > 10 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err("Count must be between 1 and 10")),
        );
    }

    let multiple = params.multiple.as_deref() == Some("true") || count > 1;
    if multiple {
        match state.quotes.resolve_many(&title, &author, count).await {
            Ok(quotes) => {
                let valid: Vec<_> = quotes.into_iter().filter(|q| validate_quote(q)).collect();
                if valid.is_empty() {
                    return (
                        StatusCode::NOT_FOUND,
                        Json(ApiResponse::err_with_message(NO_QUOTES_ERROR, NO_QUOTES_HINT)),
                    );
                }
                let message = format!(
                    "Found {} authentic quote{} for {} by {}",
                    valid.len(),
                    if valid.len() == 1 { "" } else { "s" },
                    title,
                    author
                );
                (
                    StatusCode::OK,
                    Json(ApiResponse::ok_with_message(QuoteData::Many(valid), message)),
                )
            }
            Err(QuoteError::Unavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::err_with_message(UPSTREAM_ERROR, UPSTREAM_HINT)),
            ),
        }
    } else {
        match state.quotes.resolve(&title, &author).await {
            Ok(Some(quote)) => {
                if !validate_quote(&quote) {
                    error!("Resolved quote for '{}' failed validation", title);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ApiResponse::err("Quote validation failed")),
                    );
                }
                let message = format!("Found authentic quote for {} by {}", title, author);
                (
                    StatusCode::OK,
                    Json(ApiResponse::ok_with_message(QuoteData::Single(quote), message)),
                )
            }
            Ok(None) => (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::err_with_message(NO_QUOTES_ERROR, NO_QUOTES_HINT)),
            ),
            Err(QuoteError::Unavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::err_with_message(UPSTREAM_ERROR, UPSTREAM_HINT)),
            ),
        }
    }
}

pub async fn quotes_action(
    Query(params): Query<ActionParams>,
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match params.action.as_deref() {
        Some("clear-cache") => {
            state.quotes.clear_cache();
            (
                StatusCode::OK,
                Json(ApiResponse::ok_message("Quote cache cleared successfully")),
            )
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(
                "Invalid action. Use ?action=clear-cache to clear the quote cache.",
            )),
        ),
    }
}

pub async fn quotes_preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}
