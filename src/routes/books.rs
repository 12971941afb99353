use crate::models::quotes::Quote;
use crate::models::responses::ApiResponse;
use crate::models::storage::{Book, NewBook};
use crate::utils::links::amazon_link;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub page_count: Option<i64>,
    pub goodreads_id: Option<String>,
}

pub async fn list_books(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Vec<Book>>>) {
    match state.store.list_books().await {
        Ok(books) => (StatusCode::OK, Json(ApiResponse::ok(books))),
        Err(e) => {
            error!("Failed to fetch books: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("Failed to fetch books")),
            )
        }
    }
}

pub async fn follow_book(
    State(state): State<AppState>,
    Json(body): Json<FollowRequest>,
) -> (StatusCode, Json<ApiResponse<Book>>) {
    if body.title.trim().is_empty() || body.author.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err("Title and author are required")),
        );
    }

    // Enrichment is best-effort: a missing quote never blocks the follow.
    let quote = state
        .quotes
        .resolve(&body.title, &body.author)
        .await
        .ok()
        .flatten();
    let amazon_id = amazon_link(&body.title, &body.author, body.isbn.as_deref(), None);

    let new_book = NewBook {
        title: body.title,
        author: body.author,
        isbn: body.isbn,
        cover_url: body.cover_url,
        quote: quote.map(|q| q.text),
        amazon_id: Some(amazon_id),
        description: body.description,
        published_date: body.published_date,
        page_count: body.page_count,
        goodreads_id: body.goodreads_id,
    };

    match state.store.add_book(new_book).await {
        Ok(book) => (
            StatusCode::OK,
            Json(ApiResponse::ok_with_message(book, "Book followed successfully")),
        ),
        Err(e) => {
            error!("Failed to follow book: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("Failed to follow book")),
            )
        }
    }
}

pub async fn unfollow_book(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    if id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err("Book ID is required")),
        );
    }

    match state.store.remove_book(&id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::ok_message("Book unfollowed successfully")),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err("Book not found")),
        ),
        Err(e) => {
            error!("Failed to unfollow book {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("Failed to unfollow book")),
            )
        }
    }
}

/// Fetches a fresh quote for an already-followed book.
pub async fn book_quote(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Quote>>) {
    if id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err("Book ID is required")),
        );
    }

    let book = match state.store.get_book(&id).await {
        Ok(Some(book)) => book,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::err("Book not found")),
            )
        }
        Err(e) => {
            error!("Failed to fetch book {}: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("Failed to fetch quote")),
            );
        }
    };

    match state.quotes.resolve(&book.title, &book.author).await {
        Ok(Some(quote)) => (StatusCode::OK, Json(ApiResponse::ok(quote))),
        // Rate-limited resolution reads as "no quote" here; only the ad hoc
        // quotes endpoint surfaces upstream unavailability.
        Ok(None) | Err(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err("No quote found for this book")),
        ),
    }
}
