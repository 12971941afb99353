use serde::{Deserialize, Serialize};

/// Which mechanism produced a quote. `Local` means the in-memory curated
/// table; the rest are external sources walked by the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    OpenLibrary,
    Wikiquote,
    Goodreads,
    ProjectGutenberg,
    Local,
}

/// A quote is a value object: no identity, no persistence beyond the
/// resolver's cache. `author` is the attributed speaker and may differ from
/// the book's author (a character, for instance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
    pub book: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_source: Option<QuoteSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,
}

impl Quote {
    pub fn new(
        text: impl Into<String>,
        author: impl Into<String>,
        book: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            book: book.into(),
            source: None,
            page_number: None,
            chapter: None,
            verified: None,
            fetch_source: None,
            scraped_at: None,
        }
    }
}
