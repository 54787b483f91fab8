//! nestali.gov.hr
//!
//! The register is browsed by the first letter of the surname and then by
//! page, roughly fifteen people per page. Detail pages are addressed by the
//! site's `osoba_id`.

use crate::crawler::parser::{parse_document, require_node, resolve_link, selector};
use crate::sources::{
    extract_image_url, extract_tokens, Candidate, Detail, Enumeration, EnumerationKey, FieldRule,
    Source,
};
use crate::ExtractionError;
use url::Url;

/// Letters of the Croatian alphabet used by the site's index (plus w and x)
pub const CROATIAN_LETTERS: [&str; 29] = [
    "a", "b", "c", "č", "ć", "d", "đ", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p",
    "r", "s", "š", "t", "u", "v", "w", "x", "z", "ž",
];

const LISTING_PATH: &str = "/nestale-osobe-403/403";
const ID_PARAM: &str = "osoba_id";

const LIST_CONTAINER: &str = ".nestali-list";
const LIST_ITEM: &str = ".nestali-list li";
const PERSON_LINK: &str = ".osoba-ime";
const PHOTO: &str = ".menuLeftPhoto img";

const DETAIL_RULES: &[FieldRule] = &[FieldRule::multi("profile", ".profile_details_right dl *")];

#[derive(Debug, Clone)]
pub struct Croatia {
    base_url: Url,
    letters: Vec<String>,
}

impl Croatia {
    pub fn new(base_url: Url) -> Self {
        Self::with_letters(base_url, CROATIAN_LETTERS.iter().map(|l| l.to_string()).collect())
    }

    /// Restricts enumeration to the given letters
    pub fn with_letters(base_url: Url, letters: Vec<String>) -> Self {
        Self { base_url, letters }
    }

    fn listing_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(LISTING_PATH);
        url.set_query(None);
        url
    }

    fn detail_url(&self, person_id: &str) -> String {
        let mut url = self.listing_url();
        url.query_pairs_mut().append_pair(ID_PARAM, person_id);
        url.into()
    }
}

/// Extracts the `osoba_id` value from a person link
fn person_id(href: &str, base_url: &Url) -> Option<String> {
    let url = resolve_link(href, base_url)?;
    let id = url
        .query_pairs()
        .find(|(key, _)| key == ID_PARAM)
        .map(|(_, value)| value.into_owned())?;
    (!id.is_empty()).then_some(id)
}

impl Source for Croatia {
    fn name(&self) -> &'static str {
        "croatia"
    }

    fn enumeration(&self) -> Enumeration {
        Enumeration::Letters(self.letters.clone())
    }

    fn list_url(&self, key: &EnumerationKey, page: u32) -> String {
        let mut url = self.listing_url();
        {
            let mut query = url.query_pairs_mut();
            if let EnumerationKey::Letter(letter) = key {
                query.append_pair("slovo", letter);
            }
            query.append_pair("page", &page.to_string());
        }
        url.into()
    }

    fn list_page(&self, body: &[u8]) -> Result<Vec<Candidate>, ExtractionError> {
        let document = parse_document(body);
        require_node(&document, LIST_CONTAINER)?;

        let items = selector(LIST_ITEM)?;
        let link = selector(PERSON_LINK)?;
        let mut candidates = Vec::new();

        for item in document.select(&items) {
            let href = item
                .select(&link)
                .next()
                .and_then(|anchor| anchor.value().attr("href"));

            match href.and_then(|href| person_id(href, &self.base_url)) {
                Some(id) => candidates.push(Candidate {
                    detail_url: self.detail_url(&id),
                    source_item_id: id,
                }),
                None => tracing::warn!(
                    source = "croatia",
                    href = href.unwrap_or_default(),
                    "skipping list item without a usable person link"
                ),
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
