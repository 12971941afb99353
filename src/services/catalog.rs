//! Open Library search client with a heuristic English-only post-filter.

use crate::models::responses::{OpenLibraryResponse, SearchResult};
use regex::Regex;
use std::time::Duration;
use tracing::error;

const OPEN_LIBRARY_BASE_URL: &str = "https://openlibrary.org";
const SEARCH_FIELDS: &str =
    "key,title,author_name,first_publish_year,isbn,cover_i,publisher,language,subject";

// Subject tags naming a non-English language/literature category.
const NON_ENGLISH_SUBJECTS: &[&str] = &[
    "chinese", "spanish", "french", "german", "japanese", "korean", "arabic", "russian",
    "portuguese", "italian", "dutch", "hindi", "bengali", "urdu", "persian", "turkish",
    "hebrew", "polish", "czech", "hungarian", "swedish", "norwegian", "danish", "finnish",
    "greek", "vietnamese", "thai", "indonesian", "malay", "filipino", "tagalog",
];

#[derive(Debug, Clone, Copy)]
pub enum CoverSize {
    Small,
    Medium,
    Large,
}

impl CoverSize {
    fn token(self) -> &'static str {
        match self {
            CoverSize::Small => "S",
            CoverSize::Medium => "M",
            CoverSize::Large => "L",
        }
    }
}

pub fn cover_url(cover_id: u64, size: CoverSize) -> String {
    format!(
        "https://covers.openlibrary.org/b/id/{}-{}.jpg",
        cover_id,
        size.token()
    )
}

/// Detects queries that look like a personal name: 2-4 words, each either a
/// capitalized word (hyphenation allowed) or a run of initials like "J.K.".
pub fn is_likely_author_name(query: &str) -> bool {
    let words: Vec<&str> = query.trim().split_whitespace().collect();
    if words.len() < 2 || words.len() > 4 {
        return false;
    }

    let word_pattern = Regex::new(r"^(?:[A-Z][a-z]+(?:-[A-Z][a-z]+)?|(?:[A-Z]\.)+)$").unwrap();
    words.iter().all(|word| word_pattern.is_match(word))
}

fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4e00}'..='\u{9fff}'     // CJK unified ideographs
            | '\u{3040}'..='\u{309f}'   // hiragana
            | '\u{30a0}'..='\u{30ff}'   // katakana
            | '\u{ac00}'..='\u{d7af}'   // hangul syllables
        )
    })
}

/// English-language gate applied to every raw hit, short-circuiting on the
/// first failed check.
pub fn passes_language_gate(doc: &SearchResult) -> bool {
    if doc.title.trim().is_empty() {
        return false;
    }
    let authors = match &doc.author_name {
        Some(authors) if !authors.is_empty() => authors,
        _ => return false,
    };

    if let Some(languages) = &doc.language {
        // No language metadata at all is accepted: legacy records.
        if !languages.is_empty() {
            let has_english = languages.iter().any(|lang| {
                matches!(
                    lang.trim().to_lowercase().as_str(),
                    "eng" | "en" | "english" | "en-us" | "en-gb" | "en-ca" | "en-au"
                )
            });
            if !has_english {
                return false;
            }
        }
    }

    if contains_cjk(&doc.title) {
        return false;
    }
    if authors.iter().any(|author| contains_cjk(author)) {
        return false;
    }

    if let Some(subjects) = &doc.subject {
        let non_english = subjects.iter().any(|subject| {
            let lower = subject.to_lowercase();
            NON_ENGLISH_SUBJECTS.iter().any(|term| lower.contains(term))
        });
        if non_english {
            return false;
        }
    }

    true
}

pub struct CatalogClient {
    client: reqwest::Client,
}

impl CatalogClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }

    /// Searches the catalog, returning at most `limit` English-filtered
    /// hits. Any network or parse failure yields an empty list.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let limit = limit.max(1);
        match self.try_search(query, limit).await {
            Ok(results) => results,
            Err(e) => {
                error!("Catalog search failed for '{}': {}", query, e);
                Vec::new()
            }
        }
    }

    async fn try_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, reqwest::Error> {
        let q = if is_likely_author_name(query) {
            format!("author:\"{}\" language:eng", query.trim())
        } else {
            format!("{} language:eng", query.trim())
        };
        // Over-fetch to compensate for post-filtering loss.
        let raw_limit = (limit * 2).to_string();

        let response: OpenLibraryResponse = self
            .client
            .get(format!("{}/search.json", OPEN_LIBRARY_BASE_URL))
            .query(&[
                ("q", q.as_str()),
                ("limit", raw_limit.as_str()),
                ("fields", SEARCH_FIELDS),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .docs
            .into_iter()
            .filter(passes_language_gate)
            .take(limit)
            .collect())
    }
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}
