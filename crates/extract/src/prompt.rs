//! Prompt text discovery on a rendered generation page.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

const PROMPT_SELECTORS: &[&str] = &[
    "[data-prompt]",
    "[data-testid=\"prompt\"]",
    "[data-testid*=\"prompt\"]",
    "textarea[name=\"prompt\"]",
    ".prompt",
    "[class*=\"prompt\"]",
    "[aria-label*=\"rompt\"]",
];
const PROMPT_ATTRIBUTES: &[&str] = &["data-prompt", "data-text", "data-tooltip", "aria-label", "title"];
const MIN_VISIBLE_TEXT: usize = 10;

static SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    PROMPT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("prompt selector"))
        .collect()
});
static DESCRIPTION_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["meta[name=\"description\"]", "meta[property=\"og:description\"]"]
        .iter()
        .map(|s| Selector::parse(s).expect("description selector"))
        .collect()
});
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("title selector"));
static SITE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\|[^|]*$").expect("site suffix regex"));

pub fn extract_prompt_from_html(html: &str) -> String {
    extract_prompt(&Html::parse_document(html))
}

/// Always returns a string; empty only when even the title is empty.
pub fn extract_prompt(document: &Html) -> String {
    for selector in SELECTORS.iter() {
        for element in document.select(selector) {
            if let Some(found) = prompt_from_element(&element) {
                return found;
            }
        }
    }

    for selector in DESCRIPTION_SELECTORS.iter() {
        let content = document
            .select(selector)
            .filter_map(|meta| meta.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty());
        if let Some(content) = content {
            return content.to_string();
        }
    }

    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| strip_site_suffix(&collapse_text(&title)))
        .unwrap_or_default()
}

fn prompt_from_element(element: &ElementRef<'_>) -> Option<String> {
    let attribute = PROMPT_ATTRIBUTES
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty());
    if let Some(value) = attribute {
        return Some(value.to_string());
    }

    let text = collapse_text(element);
    (text.chars().count() > MIN_VISIBLE_TEXT).then_some(text)
}

fn collapse_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_site_suffix(title: &str) -> String {
    SITE_SUFFIX_RE.replace(title, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_beats_text() {
        let html = r#"<div class="prompt-box" data-prompt="a red fox in snow">ignored text here</div>"#;
        assert_eq!(extract_prompt_from_html(html), "a red fox in snow");
    }

    #[test]
    fn falls_back_to_long_visible_text() {
        let html = r#"
            <span data-testid="prompt-label">  a   tiny
              robot watering plants </span>"#;
        assert_eq!(extract_prompt_from_html(html), "a tiny robot watering plants");
    }

    #[test]
    fn short_text_does_not_count() {
        let html = r#"<html><head>
            <meta name="description" content="  lighthouse at dusk ">
            </head><body><p class="prompt">Prompt</p></body></html>"#;
        assert_eq!(extract_prompt_from_html(html), "lighthouse at dusk");
    }

    #[test]
    fn title_suffix_is_stripped() {
        let html = "<html><head><title>Neon koi pond | GenStudio</title></head></html>";
        assert_eq!(extract_prompt_from_html(html), "Neon koi pond");
    }

    #[test]
    fn empty_document_yields_empty_prompt() {
        assert_eq!(extract_prompt_from_html("<html></html>"), "");
    }
}
