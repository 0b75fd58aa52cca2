//! Title and image extraction from listing pages.
//!
//! Markup from classified-ad sites is inconsistent, so each field is
//! resolved by an ordered list of rules. Every rule is a pure function over
//! the parsed document; the first one yielding a non-empty value wins.
//!
//! ```text
//! title: og:title → <title> → first <h1>
//! image: og:image → first <img> (src, then data-src)
//! ```
//!
//! Text values are trimmed and runs of internal whitespace are collapsed to
//! a single space, so `"Road  bike,\n 54cm"` becomes `"Road bike, 54cm"`.
//! Only the HTML document `<title>` counts; `<title>` elements inside inline
//! `<svg>` or `<math>` are icon labels. A `data:` URI in `src` is a lazy-load
//! placeholder and yields to `data-src`.

use scraper::{ElementRef, Html, Selector};

use crate::domain::ParsedMetadata;

/// A single extraction strategy.
pub type Rule = fn(&Html) -> Option<String>;

pub const TITLE_RULES: &[Rule] = &[og_title, document_title, first_heading];

pub const IMAGE_RULES: &[Rule] = &[og_image, first_img];

#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Best-effort extraction; missing data is reported as `None`.
    pub fn extract(&self, html: &str) -> ParsedMetadata {
        let document = Html::parse_document(html);

        let title = first_match(&document, TITLE_RULES);
        let image_url = first_match(&document, IMAGE_RULES).map(|u| absolutize_scheme(&u));

        ParsedMetadata { title, image_url }
    }
}

/// Run rules in order, returning the first non-empty result.
pub fn first_match(document: &Html, rules: &[Rule]) -> Option<String> {
    rules
        .iter()
        .filter_map(|rule| rule(document))
        .find(|value| !value.is_empty())
}

pub fn og_title(document: &Html) -> Option<String> {
    meta_property(document, "og:title").map(|t| collapse_whitespace(&t))
}

pub fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .find(|title| !in_foreign_content(*title))
        .map(element_text)
}

pub fn first_heading(document: &Html) -> Option<String> {
    first_element_text(document, "h1")
}

pub fn og_image(document: &Html) -> Option<String> {
    meta_property(document, "og:image")
}

pub fn first_img(document: &Html) -> Option<String> {
    let selector = Selector::parse("img").ok()?;
    let img = document.select(&selector).next()?;

    ["src", "data-src"]
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty() && !is_data_uri(v))
        .map(String::from)
}

fn is_data_uri(value: &str) -> bool {
    value
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// `//host/path` → `https://host/path`
pub fn absolutize_scheme(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

/// Content of the first `<meta>` carrying the given OpenGraph key, as either
/// `property` or `name`.
fn meta_property(document: &Html, key: &str) -> Option<String> {
    let selector =
        Selector::parse(&format!("meta[property=\"{key}\"], meta[name=\"{key}\"]")).ok()?;

    document
        .select(&selector)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(String::from)
}

/// Whether the element sits inside an `<svg>` or `<math>` subtree.
fn in_foreign_content(element: ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| matches!(el.name(), "svg" | "math"))
    })
}

fn first_element_text(document: &Html, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    document.select(&selector).next().map(element_text)
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
