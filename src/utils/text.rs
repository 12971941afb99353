//! Text helpers for the external quote sources: Project Gutenberg boilerplate
//! stripping, opening-passage extraction and HTML/whitespace cleanup.

const START_MARKER: &str = "*** START OF THE PROJECT GUTENBERG EBOOK";
const END_MARKER: &str = "*** END OF THE PROJECT GUTENBERG EBOOK";

/// Drops the Project Gutenberg license header (and trailer when present).
/// Texts without the markers are returned unchanged.
pub fn strip_gutenberg_boilerplate(text: &str) -> &str {
    let Some(start_pos) = text.find(START_MARKER) else {
        return text;
    };
    let body_start = text[start_pos..]
        .find('\n')
        .map(|pos| start_pos + pos + 1)
        .unwrap_or(start_pos);
    // Only a trailer after the body counts; fetched texts have been seen
    // with stray markers in the preamble.
    let body_end = text[body_start..]
        .find(END_MARKER)
        .map(|pos| body_start + pos)
        .unwrap_or(text.len());
    &text[body_start..body_end]
}

/// First blank-line-separated paragraph whose length is plausible for a
/// quote (strictly between 10 and 1000 characters once collapsed).
pub fn opening_passage(body: &str) -> Option<String> {
    body.split("\n\n").map(collapse_whitespace).find(|paragraph| {
        let chars = paragraph.chars().count();
        chars > 10 && chars < 1000
    })
}

/// Up to `count` leading sentences of a prose blob.
pub fn leading_sentences(text: &str, count: usize) -> Option<String> {
    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() {
        return None;
    }

    let mut taken = 0;
    let mut end = collapsed.len();
    for (pos, c) in collapsed.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            taken += 1;
            if taken == count {
                end = pos + c.len_utf8();
                break;
            }
        }
    }
    Some(collapsed[..end].trim().to_string())
}

pub fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&ldquo;", "\u{201c}")
        .replace("&rdquo;", "\u{201d}")
        .replace("&rsquo;", "\u{2019}")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
