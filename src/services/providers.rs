//! External quote sources walked by the resolver's fallback chain. Each
//! provider is best-effort: any network, parse or extraction failure is a
//! `None`, never an error crossing the trait boundary.

use crate::models::quotes::{Quote, QuoteSource};
use crate::utils::text::{
    collapse_whitespace, leading_sentences, opening_passage, strip_gutenberg_boilerplate,
    strip_html_tags,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
const RATE_LIMIT_MAX_REQUESTS: usize = 10;

/// Per-domain sliding window. A domain is blocked once it holds
/// `RATE_LIMIT_MAX_REQUESTS` timestamps younger than the window; allowed
/// requests are recorded before the fetch is attempted.
pub struct RateLimiter {
    windows: Mutex<HashMap<&'static str, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check_and_record(&self, domain: &'static str) -> bool {
        let mut windows = self.windows.lock().unwrap();
        let window = windows.entry(domain).or_default();
        let now = Instant::now();
        window.retain(|stamp| now.duration_since(*stamp) < RATE_LIMIT_WINDOW);
        if window.len() >= RATE_LIMIT_MAX_REQUESTS {
            return false;
        }
        window.push(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Provenance tag attached to quotes this provider produces.
    fn source(&self) -> QuoteSource;
    /// Rate-limit key; one window per external domain.
    fn domain(&self) -> &'static str;
    async fn try_fetch(&self, client: &reqwest::Client, title: &str, author: &str)
        -> Option<Quote>;
}

/// The fallback chain in resolution order.
pub fn default_providers() -> Vec<Box<dyn QuoteProvider>> {
    vec![
        Box::new(OpenLibraryProvider),
        Box::new(WikiquoteProvider),
        Box::new(GoodreadsProvider),
        Box::new(GutenbergProvider),
    ]
}

/// Opening-line lookup from the catalog's own metadata.
pub struct OpenLibraryProvider;

#[derive(Deserialize)]
struct FirstSentenceResponse {
    #[serde(default)]
    docs: Vec<FirstSentenceDoc>,
}

#[derive(Deserialize)]
struct FirstSentenceDoc {
    #[serde(default)]
    first_sentence: Option<serde_json::Value>,
}

// Open Library serves first_sentence as either a string or a string array
// depending on the record's age.
fn first_sentence_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(collapse_whitespace(s)),
        serde_json::Value::Array(items) => items
            .iter()
            .find_map(|item| item.as_str())
            .map(collapse_whitespace),
        _ => None,
    }
}

#[async_trait]
impl QuoteProvider for OpenLibraryProvider {
    fn source(&self) -> QuoteSource {
        QuoteSource::OpenLibrary
    }

    fn domain(&self) -> &'static str {
        "openlibrary.org"
    }

    async fn try_fetch(
        &self,
        client: &reqwest::Client,
        title: &str,
        author: &str,
    ) -> Option<Quote> {
        let response = client
            .get("https://openlibrary.org/search.json")
            .query(&[
                ("title", title),
                ("author", author),
                ("fields", "first_sentence"),
                ("limit", "5"),
            ])
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;
        let body: FirstSentenceResponse = response.json().await.ok()?;

        let text = body
            .docs
            .iter()
            .find_map(|doc| first_sentence_text(doc.first_sentence.as_ref()?))?;

        let mut quote = Quote::new(text, author, title);
        quote.source = Some("Opening line".to_string());
        quote.fetch_source = Some(self.source());
        Some(quote)
    }
}

/// Leading sentences of the book's Wikiquote page summary.
pub struct WikiquoteProvider;

#[derive(Deserialize)]
struct PageSummary {
    #[serde(default)]
    extract: String,
}

#[async_trait]
impl QuoteProvider for WikiquoteProvider {
    fn source(&self) -> QuoteSource {
        QuoteSource::Wikiquote
    }

    fn domain(&self) -> &'static str {
        "en.wikiquote.org"
    }

    async fn try_fetch(
        &self,
        client: &reqwest::Client,
        title: &str,
        author: &str,
    ) -> Option<Quote> {
        let slug = title.trim().replace(' ', "_");
        let summary: PageSummary = client
            .get(format!(
                "https://en.wikiquote.org/api/rest_v1/page/summary/{}",
                slug
            ))
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .json()
            .await
            .ok()?;

        let text = leading_sentences(&summary.extract, 2)?;
        let mut quote = Quote::new(text, author, title);
        quote.source = Some("Wikiquote".to_string());
        quote.fetch_source = Some(self.source());
        Some(quote)
    }
}

/// Scrapes the first hit of the Goodreads quote search page.
pub struct GoodreadsProvider;

#[async_trait]
impl QuoteProvider for GoodreadsProvider {
    fn source(&self) -> QuoteSource {
        QuoteSource::Goodreads
    }

    fn domain(&self) -> &'static str {
        "www.goodreads.com"
    }

    async fn try_fetch(
        &self,
        client: &reqwest::Client,
        title: &str,
        author: &str,
    ) -> Option<Quote> {
        let query = format!("{} {}", title, author);
        let html = client
            .get("https://www.goodreads.com/quotes/search")
            .query(&[("q", query.as_str())])
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .text()
            .await
            .ok()?;

        let re = Regex::new(r#"(?s)<div class="quoteText">(.*?)(?:&rdquo;|\u{201d}|</div>)"#)
            .unwrap();
        let captured = re.captures(&html)?.get(1)?.as_str();
        let text = collapse_whitespace(&strip_html_tags(captured))
            .trim_matches(|c: char| matches!(c, '\u{201c}' | '\u{201d}' | '"'))
            .to_string();
        if text.is_empty() {
            debug!("Goodreads page for '{}' had no extractable quote", title);
            return None;
        }

        let mut quote = Quote::new(text, author, title);
        quote.source = Some("Goodreads".to_string());
        quote.fetch_source = Some(self.source());
        Some(quote)
    }
}

/// Opening passage of the public-domain text, located through the Gutendex
/// index.
pub struct GutenbergProvider;

#[derive(Deserialize)]
struct GutendexResponse {
    #[serde(default)]
    results: Vec<GutendexBook>,
}

#[derive(Deserialize)]
struct GutendexBook {
    title: String,
    #[serde(default)]
    formats: HashMap<String, String>,
}

#[async_trait]
impl QuoteProvider for GutenbergProvider {
    fn source(&self) -> QuoteSource {
        QuoteSource::ProjectGutenberg
    }

    fn domain(&self) -> &'static str {
        "gutendex.com"
    }

    async fn try_fetch(
        &self,
        client: &reqwest::Client,
        title: &str,
        author: &str,
    ) -> Option<Quote> {
        let query = format!("{} {}", title, author);
        let index: GutendexResponse = client
            .get("https://gutendex.com/books/")
            .query(&[("search", query.as_str())])
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .json()
            .await
            .ok()?;

        let wanted = title.to_lowercase();
        let book = index
            .results
            .into_iter()
            .find(|b| b.title.to_lowercase().contains(&wanted))?;
        let text_url = book
            .formats
            .iter()
            .find(|(mime, _)| mime.starts_with("text/plain"))
            .map(|(_, url)| url.clone())?;

        let full_text = client
            .get(&text_url)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .text()
            .await
            .ok()?;

        let passage = opening_passage(strip_gutenberg_boilerplate(&full_text))?;
        let mut quote = Quote::new(passage, author, title);
        quote.source = Some(format!("Project Gutenberg: {}", book.title));
        quote.fetch_source = Some(self.source());
        Some(quote)
    }
}
