use axum::routing::{delete, get};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

mod models;
mod routes;
mod services;
mod utils;

use models::storage::{BookStore, RedisBackend, SqliteBackend};
use routes::{
    books::{book_quote, follow_book, list_books, unfollow_book},
    health::health_check,
    quotes::{get_quotes, quotes_action, quotes_preflight},
    search::search_books,
};
use services::catalog::CatalogClient;
use services::quotes::QuoteService;

/// Shared handles injected into every handler; constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookStore + Send + Sync>,
    pub quotes: Arc<QuoteService>,
    pub catalog: Arc<CatalogClient>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/status", get(health_check))
        .route("/books", get(list_books).post(follow_book))
        .route("/books/:id", delete(unfollow_book))
        .route("/books/:id/quote", get(book_quote))
        .route(
            "/quotes",
            get(get_quotes).post(quotes_action).options(quotes_preflight),
        )
        .route("/search", get(search_books))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The remote KV backend is selected only when all three of its connection
/// settings are present; otherwise the embedded SQLite store is used.
async fn select_backend() -> Arc<dyn BookStore + Send + Sync> {
    let kv_configured = ["KV_URL", "KV_REST_API_URL", "KV_REST_API_TOKEN"]
        .iter()
        .all(|var| std::env::var(var).is_ok());

    if kv_configured {
        let url = std::env::var("KV_URL").expect("KV_URL is set");
        info!("Using Redis (KV) storage backend");
        Arc::new(RedisBackend::new(&url).expect("Failed to connect to Redis"))
    } else {
        let path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "data/twbooks.db".to_string());
        if let Some(parent) = std::path::Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).expect("Failed to create data directory");
            }
        }
        info!("Using SQLite storage backend at {}", path);
        let backend = SqliteBackend::new(&path)
            .await
            .expect("Failed to open SQLite database");
        Arc::new(backend)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("twbooks_service=info,tower_http=info")
        .init();

    let store = select_backend().await;
    if let Err(e) = store.init().await {
        error!("Failed to initialize storage backend: {}", e);
        std::process::exit(1);
    }
    info!("Storage backend ready");

    let state = AppState {
        store,
        quotes: Arc::new(QuoteService::new()),
        catalog: Arc::new(CatalogClient::new()),
    };
    let app = app(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "7080".to_string());
    let addr = format!("0.0.0.0:{}", port);

    info!("TWBooks service starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
