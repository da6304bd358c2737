//! HTML helpers: page titles, academic page text and fallback titles.

use regex_lite::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Blocks at or below this many characters are treated as navigation noise
const MIN_BLOCK_CHARS: usize = 50;

const UNTITLED: &str = "Untitled Paper";

/// Trimmed text of the document's `<title>`, if present and non-empty
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|title| !title.is_empty())
}

/// Readable text of an academic page.
///
/// Paragraphs inside `<article>` longer than 50 characters win; when none
/// qualify, `<div>` blocks longer than 50 characters are used instead.
/// Qualifying blocks are joined with single spaces.
pub fn academic_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let article = qualifying_blocks(&document, "article p");
    if !article.is_empty() {
        return article.join(" ");
    }

    qualifying_blocks(&document, "div").join(" ")
}

fn qualifying_blocks(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|text| text.chars().count() > MIN_BLOCK_CHARS)
        .collect()
}

/// Title for a URL when the page offers none: the last path segment
/// (host when the path is empty), extension dropped, separators spaced,
/// title-cased.
pub fn title_from_url(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        let segment = url.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
        return derive_title(strip_extension(segment));
    };

    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last());

    match (segment, parsed.host_str()) {
        (Some(segment), _) => derive_title(strip_extension(segment)),
        (None, Some(host)) => derive_title(host),
        (None, None) => derive_title(""),
    }
}

/// Title for a DOI when the landing page offers none
pub fn title_from_doi(doi: &str) -> String {
    derive_title(doi)
}

/// Replace separators with spaces and title-case every word
pub fn derive_title(source: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let separators =
        SEPARATORS.get_or_init(|| Regex::new(r"(%20|[-_+/])+").expect("valid separator regex"));

    let spaced = separators.replace_all(source, " ");
    let title = spaced
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn strip_extension(segment: &str) -> &str {
    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            stem
        }
        _ => segment,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
