use crate::parsers::text::normalize_whitespace_in_segment;
use scraper::{ElementRef, Html, Selector};

/// Converts an HTML document to text, one text node per line.
///
/// Used for HTML-only mail bodies, so line structure matters more than
/// prose layout: the offer parser downstream works line by line.
pub fn to_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let text = doc
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    ::log::debug!("HTML body converted to {} lines", text.lines().count());
    text
}

/// Returns the `href` of every element matching `selector`, in document order
pub fn links(html: &str, selector: &str) -> Vec<String> {
    let Some(selector) = parse_selector(selector) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);

    let links = doc
        .select(&selector)
        .filter_map(|e| e.value().attr("href"))
        .map(|s| s.to_string())
        .collect::<Vec<String>>();

    ::log::debug!("HTML parser found {} links", links.len());
    if !links.is_empty() {
        ::log::debug!(
            "First few links: {:?}",
            links.iter().take(5).collect::<Vec<_>>()
        );
    }
    links
}

/// Whitespace-normalized text of the first element matching `selector`
/// that has any text at all
pub fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let selector = parse_selector(selector)?;
    doc.select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

/// Value of `attr` on the first element matching `selector`, trimmed
pub fn first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = parse_selector(selector)?;
    doc.select(&selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(|value| value.trim().to_string())
}

/// Whitespace-normalized text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace_in_segment(&element.text().collect::<Vec<_>>().join(" "))
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(selector) => Some(selector),
        Err(e) => {
            ::log::warn!("Invalid CSS selector '{}': {}", selector, e);
            None
        }
    }
}
