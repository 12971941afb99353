//! Outbound marketplace/e-reader/review-site URL builders. Pure string
//! construction, no network calls.

use regex::Regex;

fn encode_query(title: &str, author: &str) -> String {
    let query = format!("{} {}", title, author);
    query
        .chars()
        .map(|c| match c {
            ' ' => "+".to_string(),
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            _ => {
                let mut encoded = String::new();
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    encoded.push_str(&format!("%{:02X}", byte));
                }
                encoded
            }
        })
        .collect()
}

fn is_asin(candidate: &str) -> bool {
    Regex::new(r"^[A-Z0-9]{10}$").unwrap().is_match(candidate)
}

/// Prefers a direct product link (ASIN, then ISBN with punctuation
/// stripped), falling back to a keyword search.
pub fn amazon_link(title: &str, author: &str, isbn: Option<&str>, asin: Option<&str>) -> String {
    if let Some(asin) = asin.filter(|a| is_asin(a)) {
        return format!("https://www.amazon.com/dp/{}?tag=twbooks-20", asin);
    }

    if let Some(isbn) = isbn.filter(|i| !i.trim().is_empty()) {
        return format!(
            "https://www.amazon.com/dp/{}?tag=twbooks-20",
            isbn.replace('-', "")
        );
    }

    format!(
        "https://www.amazon.com/s?k={}&i=stripbooks&tag=twbooks-20",
        encode_query(title, author)
    )
}

pub fn kindle_link(title: &str, author: &str, asin: Option<&str>) -> String {
    if let Some(asin) = asin.filter(|a| is_asin(a)) {
        return format!("https://read.amazon.com/?asin={}", asin);
    }

    format!(
        "https://www.amazon.com/s?k={}&i=digital-text",
        encode_query(title, author)
    )
}

pub fn goodreads_link(title: &str, author: &str) -> String {
    format!(
        "https://www.goodreads.com/search?q={}",
        encode_query(title, author)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asin_takes_priority_over_isbn() {
        let link = amazon_link("Dune", "Frank Herbert", Some("978-0441013593"), Some("B0C3WMJFWB"));
        assert_eq!(link, "https://www.amazon.com/dp/B0C3WMJFWB?tag=twbooks-20");
    }

    #[test]
    fn isbn_is_stripped_of_hyphens() {
        let link = amazon_link("Dune", "Frank Herbert", Some("978-0441013593"), None);
        assert_eq!(link, "https://www.amazon.com/dp/9780441013593?tag=twbooks-20");
    }

    #[test]
    fn missing_isbn_falls_back_to_search() {
        let link = amazon_link("Dune", "Frank Herbert", None, None);
        assert_eq!(
            link,
            "https://www.amazon.com/s?k=Dune+Frank+Herbert&i=stripbooks&tag=twbooks-20"
        );
    }

    #[test]
    fn malformed_asin_is_ignored() {
        let link = amazon_link("Dune", "Frank Herbert", None, Some("not-an-asin"));
        assert!(link.contains("/s?k="));
    }

    #[test]
    fn kindle_link_uses_reader_url_for_asin() {
        assert_eq!(
            kindle_link("Dune", "Frank Herbert", Some("B0C3WMJFWB")),
            "https://read.amazon.com/?asin=B0C3WMJFWB"
        );
        assert_eq!(
            kindle_link("Dune", "Frank Herbert", None),
            "https://www.amazon.com/s?k=Dune+Frank+Herbert&i=digital-text"
        );
    }

    #[test]
    fn goodreads_link_is_a_keyword_search() {
        assert_eq!(
            goodreads_link("Pride and Prejudice", "Jane Austen"),
            "https://www.goodreads.com/search?q=Pride+and+Prejudice+Jane+Austen"
        );
    }

    #[test]
    fn query_encoding_escapes_reserved_characters() {
        assert_eq!(
            goodreads_link("Q&A", "Vikas Swarup"),
            "https://www.goodreads.com/search?q=Q%26A+Vikas+Swarup"
        );
    }
}
