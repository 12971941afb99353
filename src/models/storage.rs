use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A followed book. Created by a follow action, destroyed by an unfollow;
/// there is no update path. `followed_at` is set once at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amazon_id: Option<String>,
    pub followed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goodreads_id: Option<String>,
}

/// Fields supplied by a follow action; the backend generates `id` and
/// `followed_at`.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub quote: Option<String>,
    pub amazon_id: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub page_count: Option<i64>,
    pub goodreads_id: Option<String>,
}

impl NewBook {
    fn into_book(self) -> Book {
        Book {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            cover_url: self.cover_url,
            quote: self.quote,
            amazon_id: self.amazon_id,
            // Fixed-width nanosecond RFC3339 so lexicographic order is
            // chronological order in both backends.
            followed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            description: self.description,
            published_date: self.published_date,
            page_count: self.page_count,
            goodreads_id: self.goodreads_id,
        }
    }
}

/// Common contract implemented by both storage backends. Handlers receive
/// owned copies, never references into storage.
#[async_trait]
pub trait BookStore {
    /// Idempotent setup; safe to call more than once.
    async fn init(&self) -> Result<(), StorageError>;
    /// All books, most-recently-followed first.
    async fn list_books(&self) -> Result<Vec<Book>, StorageError>;
    async fn add_book(&self, book: NewBook) -> Result<Book, StorageError>;
    /// Returns whether a deletion occurred; an absent id is not an error.
    async fn remove_book(&self, id: &str) -> Result<bool, StorageError>;
    async fn get_book(&self, id: &str) -> Result<Option<Book>, StorageError>;
    /// Releases backend resources; safe to call when already closed.
    async fn close(&self);
}

pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    pub async fn new(path: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }
}

fn book_from_row(row: &SqliteRow) -> Book {
    Book {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        isbn: row.get("isbn"),
        cover_url: row.get("cover_url"),
        quote: row.get("quote"),
        amazon_id: row.get("amazon_id"),
        followed_at: row.get("followed_at"),
        description: row.get("description"),
        published_date: row.get("published_date"),
        page_count: row.get("page_count"),
        goodreads_id: row.get("goodreads_id"),
    }
}

#[async_trait]
impl BookStore for SqliteBackend {
    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                isbn TEXT,
                cover_url TEXT,
                quote TEXT,
                amazon_id TEXT,
                followed_at TEXT NOT NULL,
                description TEXT,
                published_date TEXT,
                page_count INTEGER,
                goodreads_id TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Listing order comes from this index, not an in-memory sort.
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_books_followed_at ON books(followed_at DESC)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_author ON books(author)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_title ON books(title)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_books(&self) -> Result<Vec<Book>, StorageError> {
        let rows = sqlx::query("SELECT * FROM books ORDER BY followed_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(book_from_row).collect())
    }

    async fn add_book(&self, book: NewBook) -> Result<Book, StorageError> {
        let book = book.into_book();
        sqlx::query(
            r#"
            INSERT INTO books (
                id, title, author, isbn, cover_url, quote, amazon_id,
                followed_at, description, published_date, page_count, goodreads_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.cover_url)
        .bind(&book.quote)
        .bind(&book.amazon_id)
        .bind(&book.followed_at)
        .bind(&book.description)
        .bind(&book.published_date)
        .bind(book.page_count)
        .bind(&book.goodreads_id)
        .execute(&self.pool)
        .await?;

        Ok(book)
    }

    async fn remove_book(&self, id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_book(&self, id: &str) -> Result<Option<Book>, StorageError> {
        let row = sqlx::query("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(book_from_row))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// Key layout: book:{id} holds the JSON blob, books:list is an
// append-ordered list of ids, books:count a counter.
const BOOK_PREFIX: &str = "book:";
const BOOKS_LIST_KEY: &str = "books:list";
const BOOKS_COUNT_KEY: &str = "books:count";

pub struct RedisBackend {
    client: redis::Client,
}

impl RedisBackend {
    pub fn new(redis_url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StorageError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl BookStore for RedisBackend {
    async fn init(&self) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        // Seed the counter on first run; the list key needs no seeding,
        // an absent redis list reads as empty.
        conn.set_nx::<_, _, bool>(BOOKS_COUNT_KEY, 0).await?;
        Ok(())
    }

    async fn list_books(&self) -> Result<Vec<Book>, StorageError> {
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn.lrange(BOOKS_LIST_KEY, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| format!("{}{}", BOOK_PREFIX, id)).collect();
        // One batched round trip instead of a GET per id.
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let mut books = Vec::with_capacity(values.len());
        for value in values.into_iter().flatten() {
            books.push(serde_json::from_str::<Book>(&value)?);
        }
        // The list is append-ordered, so reversal yields recency order,
        // matching the SQLite backend exactly.
        books.reverse();
        Ok(books)
    }

    async fn add_book(&self, book: NewBook) -> Result<Book, StorageError> {
        let book = book.into_book();
        let mut conn = self.connection().await?;
        let value = serde_json::to_string(&book)?;

        conn.set::<_, _, ()>(format!("{}{}", BOOK_PREFIX, book.id), &value)
            .await?;
        conn.rpush::<_, _, ()>(BOOKS_LIST_KEY, &book.id).await?;
        conn.incr::<_, _, ()>(BOOKS_COUNT_KEY, 1).await?;

        Ok(book)
    }

    async fn remove_book(&self, id: &str) -> Result<bool, StorageError> {
        let mut conn = self.connection().await?;
        let key = format!("{}{}", BOOK_PREFIX, id);

        let existing: Option<String> = conn.get(&key).await?;
        if existing.is_none() {
            return Ok(false);
        }

        conn.del::<_, ()>(&key).await?;
        conn.lrem::<_, _, ()>(BOOKS_LIST_KEY, 0, id).await?;
        conn.decr::<_, _, ()>(BOOKS_COUNT_KEY, 1).await?;

        Ok(true)
    }

    async fn get_book(&self, id: &str) -> Result<Option<Book>, StorageError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(format!("{}{}", BOOK_PREFIX, id)).await?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn close(&self) {
        // The multiplexed connection is released when the client drops.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::time::Duration;

    async fn temp_backend() -> SqliteBackend {
        let path = std::env::temp_dir().join(format!("twbooks-test-{}.db", Uuid::new_v4()));
        let backend = SqliteBackend::new(path.to_str().unwrap())
            .await
            .expect("sqlite backend");
        backend.init().await.expect("init");
        backend
    }

    fn new_book(title: &str, author: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: author.to_string(),
            ..NewBook::default()
        }
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let backend = temp_backend().await;
        backend.init().await.expect("second init");
    }

    #[tokio::test]
    async fn add_then_get_round_trip() {
        let backend = temp_backend().await;
        let before = Utc::now();

        let added = backend
            .add_book(new_book("Dune", "Frank Herbert"))
            .await
            .unwrap();
        let fetched = backend.get_book(&added.id).await.unwrap().expect("stored");

        assert_eq!(fetched.title, "Dune");
        assert_eq!(fetched.author, "Frank Herbert");
        let followed_at = DateTime::parse_from_rfc3339(&fetched.followed_at)
            .unwrap()
            .with_timezone(&Utc);
        assert!(followed_at >= before);
    }

    #[tokio::test]
    async fn remove_missing_id_returns_false_and_list_is_unchanged() {
        let backend = temp_backend().await;
        backend
            .add_book(new_book("Dune", "Frank Herbert"))
            .await
            .unwrap();

        assert!(!backend.remove_book("no-such-id").await.unwrap());
        assert_eq!(backend.list_books().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_existing_id_deletes_the_book() {
        let backend = temp_backend().await;
        let added = backend
            .add_book(new_book("Dune", "Frank Herbert"))
            .await
            .unwrap();

        assert!(backend.remove_book(&added.id).await.unwrap());
        let remaining = backend.list_books().await.unwrap();
        assert!(remaining.iter().all(|b| b.id != added.id));
    }

    #[tokio::test]
    async fn list_is_most_recently_followed_first() {
        let backend = temp_backend().await;
        let mut ids = Vec::new();
        for title in ["First", "Second", "Third"] {
            let book = backend.add_book(new_book(title, "Author")).await.unwrap();
            ids.push(book.id);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let listed: Vec<String> = backend
            .list_books()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        ids.reverse();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn missing_book_is_none() {
        let backend = temp_backend().await;
        assert!(backend.get_book("missing").await.unwrap().is_none());
    }
}
