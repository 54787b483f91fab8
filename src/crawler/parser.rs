//! HTML query helpers
//!
//! Thin layer over `scraper` that the source extractors use to turn selector
//! rules into token lists, attribute values and absolute links. Documents are
//! parsed and queried inside synchronous functions so no parsed tree is ever
//! held across an `.await`.

use crate::ExtractionError;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Parses raw page bytes into a document tree
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn parse_document(body: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(body))
}

/// Compiles a selector query
pub fn selector(query: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(query).map_err(|e| ExtractionError::InvalidSelector {
        selector: query.to_string(),
        message: format!("{:?}", e),
    })
}

/// Returns the first text child of a node
///
/// * `Ok(None)` - the node has no children
/// * `Err(NonTextNode)` - the first child is an element, comment or similar
///
/// Text is returned as-is, without trimming, so fingerprints see exactly
/// what the page served.
pub fn first_text(element: ElementRef<'_>, query: &str) -> Result<Option<String>, ExtractionError> {
    let Some(child) = element.first_child() else {
        return Ok(None);
    };

    match child.value() {
        Node::Text(text) => Ok(Some(String::from(&**text))),
        Node::Element(inner) => Err(ExtractionError::NonTextNode {
            selector: query.to_string(),
            tag: inner.name().to_string(),
        }),
        _ => Err(ExtractionError::NonTextNode {
            selector: query.to_string(),
            tag: "#non-text".to_string(),
        }),
    }
}

/// Collects the first text child of every node matched by `query`
///
/// Childless nodes contribute nothing.
pub fn select_texts(document: &Html, query: &str) -> Result<Vec<String>, ExtractionError> {
    let sel = selector(query)?;
    let mut texts = Vec::new();

    for element in document.select(&sel) {
        if let Some(text) = first_text(element, query)? {
            texts.push(text);
        }
    }

    Ok(texts)
}

/// First text child of the first node matched by `query`, if any
pub fn select_first_text(document: &Html, query: &str) -> Result<Option<String>, ExtractionError> {
    let sel = selector(query)?;
    match document.select(&sel).next() {
        Some(element) => first_text(element, query),
        None => Ok(None),
    }
}

/// Attribute of the first node matched by `query`, if both exist
pub fn select_attr(
    document: &Html,
    query: &str,
    attr: &str,
) -> Result<Option<String>, ExtractionError> {
    let sel = selector(query)?;
    Ok(document
        .select(&sel)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(str::to_string))
}

/// Fails unless `query` matches at least one node
pub fn require_node(document: &Html, query: &str) -> Result<(), ExtractionError> {
    let sel = selector(query)?;
    if document.select(&sel).next().is_none() {
        return Err(ExtractionError::MissingNode {
            selector: query.to_string(),
        });
    }
    Ok(())
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, fragment-only links, non-HTTP schemes
/// and anything that does not parse.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
