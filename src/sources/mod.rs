//! Source extractors
//!
//! Each supported website is a [`Source`]: it knows how its listing is
//! enumerated, how to build list URLs, and which selectors turn a list page
//! into candidates and a detail page into tokens plus an image reference.
//! Extractors work on raw page bytes and never perform I/O; the orchestrator
//! does the fetching.

mod croatia;
mod romania;

pub use croatia::{Croatia, CROATIAN_LETTERS};
pub use romania::Romania;

use crate::config::SourcesConfig;
use crate::crawler::parser::{select_attr, select_first_text, select_texts};
use crate::{ConfigError, ExtractionError};
use scraper::Html;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// How a source's listing is traversed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enumeration {
    /// Fixed keys (alphabet letters), each walked from page 1 until a list
    /// page yields no candidates
    Letters(Vec<String>),

    /// Page numbers read from an index page before enumeration starts;
    /// failing to read them aborts the run
    DiscoveredPages { index_url: String },
}

/// One unit of traversal within a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumerationKey {
    Letter(String),
    Page(u32),
}

impl EnumerationKey {
    /// Whether the key spans several list pages
    pub fn is_paginated(&self) -> bool {
        matches!(self, Self::Letter(_))
    }
}

impl fmt::Display for EnumerationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Letter(letter) => write!(f, "letter {}", letter),
            Self::Page(page) => write!(f, "page {}", page),
        }
    }
}

/// Reference to one detail page found on a list page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The website's own identifier for the entry
    pub source_item_id: String,
    /// Absolute URL of the detail page
    pub detail_url: String,
}

/// What a detail page yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    /// Raw field texts in rule order
    pub tokens: Vec<String>,
    /// Absolute image URL, when the page shows a photograph
    pub image_url: Option<String>,
}

/// Whether a rule reads one node or every matching node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Single,
    Multi,
}

/// Maps a semantic field to the selector that extracts it
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub selector: &'static str,
    pub kind: FieldKind,
}

impl FieldRule {
    pub const fn single(name: &'static str, selector: &'static str) -> Self {
        Self {
            name,
            selector,
            kind: FieldKind::Single,
        }
    }

    pub const fn multi(name: &'static str, selector: &'static str) -> Self {
        Self {
            name,
            selector,
            kind: FieldKind::Multi,
        }
    }
}

/// Applies field rules in order and concatenates their tokens
///
/// A single-value rule with no match adds nothing; missing optional fields
/// are not an error.
pub fn extract_tokens(document: &Html, rules: &[FieldRule]) -> Result<Vec<String>, ExtractionError> {
    let mut tokens = Vec::new();

    for rule in rules {
        match rule.kind {
            FieldKind::Multi => tokens.extend(select_texts(document, rule.selector)?),
            FieldKind::Single => {
                if let Some(text) = select_first_text(document, rule.selector)? {
                    tokens.push(text);
                }
            }
        }
    }

    Ok(tokens)
}

/// Reads an image `src` and resolves it against the source base URL
pub fn extract_image_url(
    document: &Html,
    selector: &str,
    base_url: &Url,
) -> Result<Option<String>, ExtractionError> {
    Ok(select_attr(document, selector, "src")?
        .and_then(|src| crate::crawler::parser::resolve_link(&src, base_url))
        .map(String::from))
}

/// Site-specific extraction rules consumed by the orchestrator
pub trait Source: Send + Sync {
    /// Short lowercase name; also the store table prefix
    fn name(&self) -> &'static str;

    /// How the listing is traversed
    fn enumeration(&self) -> Enumeration;

    /// Reads page numbers from the index page of a
    /// [`Enumeration::DiscoveredPages`] source
    ///
    /// Letter sources never fetch an index page and keep the empty default.
    fn page_numbers(&self, _index_page: &[u8]) -> Result<Vec<u32>, ExtractionError> {
        Ok(Vec::new())
    }

    /// URL of one list page for a key
    fn list_url(&self, key: &EnumerationKey, page: u32) -> String;

    /// Candidates on a list page, in document order
    ///
    /// An empty result ends the key. A missing list container is an error.
    fn list_page(&self, body: &[u8]) -> Result<Vec<Candidate>, ExtractionError>;

    /// Tokens and image reference of a detail page
    fn detail_page(&self, body: &[u8]) -> Result<Detail, ExtractionError>;
}

/// Builds every enabled source from configuration
pub fn build_sources(config: &SourcesConfig) -> Result<Vec<Arc<dyn Source>>, ConfigError> {
    let mut sources: Vec<Arc<dyn Source>> = Vec::new();

    if config.croatia.enabled {
        sources.push(Arc::new(Croatia::new(parse_base_url(&config.croatia.base_url)?)));
    }
    if config.romania.enabled {
        sources.push(Arc::new(Romania::new(parse_base_url(&config.romania.base_url)?)));
    }

    Ok(sources)
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", raw, e)))
}
