//! politiaromana.ro
//!
//! The listing is a single paginated gallery. The page selector on the index
//! page tells how many pages exist; each page is then fetched once. Person
//! links end in `-<id>`.

use crate::crawler::parser::{parse_document, require_node, resolve_link, selector, select_texts};
use crate::sources::{
    extract_image_url, extract_tokens, Candidate, Detail, Enumeration, EnumerationKey, FieldRule,
    Source,
};
use crate::ExtractionError;
use url::Url;

const LISTING_PATH: &str = "/ro/persoane-disparute";

const PAGE_OPTIONS: &str = "#num_page option";
const LIST_CONTAINER: &str = ".contentList";
const PERSON_LINK: &str = ".contentList .boxPoza a";
const PHOTO: &str = ".pozaDetaliiDisparuti img";

const DETAIL_RULES: &[FieldRule] = &[
    FieldRule::multi("basic-info", ".descDetaliiDisparuti *"),
    FieldRule::single("description", ".semnalmenteDisparuti p"),
    FieldRule::single("details", ".detaliiSuplimentareDisparuti p"),
];

#[derive(Debug, Clone)]
pub struct Romania {
    base_url: Url,
}

impl Romania {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    fn root(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}

/// The site id is whatever follows the last `-` of the link path
fn person_id(url: &Url) -> Option<String> {
    let (_, id) = url.path().trim_end_matches('/').rsplit_once('-')?;
    (!id.is_empty()).then(|| id.to_string())
}

impl Source for Romania {
    fn name(&self) -> &'static str {
        "romania"
    }

    fn enumeration(&self) -> Enumeration {
        Enumeration::DiscoveredPages {
            index_url: format!("{}{}", self.root(), LISTING_PATH),
        }
    }

    fn page_numbers(&self, index_page: &[u8]) -> Result<Vec<u32>, ExtractionError> {
        let document = parse_document(index_page);
        require_node(&document, PAGE_OPTIONS)?;

        let mut pages = Vec::new();
        for option in select_texts(&document, PAGE_OPTIONS)? {
            match option.trim().parse::<u32>() {
                Ok(page) => pages.push(page),
                Err(_) => tracing::debug!(source = "romania", option = %option, "skipping non-numeric page option"),
            }
        }

        if pages.is_empty() {
            return Err(ExtractionError::MissingNode {
                selector: PAGE_OPTIONS.to_string(),
            });
        }

        Ok(pages)
    }

    /// The site takes the page as a literal `&page=` suffix on the path
    fn list_url(&self, _key: &EnumerationKey, page: u32) -> String {
        format!("{}{}&page={}", self.root(), LISTING_PATH, page)
    }

    fn list_page(&self, body: &[u8]) -> Result<Vec<Candidate>, ExtractionError> {
        let document = parse_document(body);
        require_node(&document, LIST_CONTAINER)?;

        let links = selector(PERSON_LINK)?;
        let mut candidates = Vec::new();

        for anchor in document.select(&links) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };

            let Some(url) = resolve_link(href, &self.base_url) else {
                tracing::warn!(source = "romania", href, "skipping unresolvable person link");
                continue;
            };

            match person_id(&url) {
                Some(id) => candidates.push(Candidate {
                    source_item_id: id,
                    detail_url: url.into(),
                }),
                None => tracing::warn!(source = "romania", href, "skipping person link without an id"),
            }
        }

        Ok(candidates)
    }

    fn detail_page(&self, body: &[u8]) -> Result<Detail, ExtractionError> {
        let document = parse_document(body);
        Ok(Detail {
            tokens: extract_tokens(&document, DETAIL_RULES)?,
            image_url: extract_image_url(&document, PHOTO, &self.base_url)?,
        })
    }
}
