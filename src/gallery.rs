//! Gallery scanning: media candidates and page sections in document order.
//!
//! Carrd renders galleries as lists of lightbox thumbnails whose `<img>`
//! carries the real source in `data-src` and an inline SVG placeholder in
//! `src`. Standalone images and videos follow the same lazy-load convention.
//! Pages are split into `<section id="NAME-section">` blocks, addressed by
//! `#NAME` fragments.

use crate::constants::{SECTION_ID_SUFFIX, SOURCE_ATTRIBUTES};
use crate::utils;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

static MEDIA_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img, video").unwrap());
static SOURCE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("source").unwrap());
static SECTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section[id], [id$='-section']").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// An image or video referenced by a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCandidate {
    /// Absolute URL as found in the markup, query included.
    pub raw_url: Url,
    /// The URL to ingest. Starts as `raw_url` without its query and is
    /// replaced by the variant resolver.
    pub resolved_url: Url,
    pub kind: MediaKind,
    /// Filled in by the downstream asset fetch, never by this crate.
    pub size_bytes: Option<u64>,
    /// Position in the page, for stable ordering.
    pub order_index: usize,
}

impl MediaCandidate {
    pub fn new(raw_url: Url, kind: MediaKind, order_index: usize) -> Self {
        let resolved_url = utils::strip_query(&raw_url);
        Self {
            raw_url,
            resolved_url,
            kind,
            size_bytes: None,
            order_index,
        }
    }

    /// A candidate whose URL is emitted exactly as given.
    pub fn verbatim(url: Url, kind: MediaKind) -> Self {
        Self {
            resolved_url: url.clone(),
            raw_url: url,
            kind,
            size_bytes: None,
            order_index: 0,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }
}

/// A named, anchorable block of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSection {
    /// Fragment name, e.g. `portfolio` for `#portfolio`
    pub name: String,
    /// Element id, e.g. `portfolio-section`
    pub element_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gallery {
    pub media: Vec<MediaCandidate>,
    pub sections: Vec<PageSection>,
}

impl Gallery {
    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    pub fn section(&self, name: &str) -> Option<&PageSection> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// Scan a whole document for media and sections.
pub fn extract_gallery(html: &str, base_url: &Url) -> Gallery {
    let document = Html::parse_document(html);
    Gallery {
        media: media_in(document.root_element(), base_url),
        sections: sections_in(&document),
    }
}

/// The element a `#fragment` addresses, by platform convention first.
pub fn find_section<'a>(document: &'a Html, fragment: &str) -> Option<ElementRef<'a>> {
    let fragment = fragment.trim_start_matches('#');
    if fragment.is_empty() {
        return None;
    }
    let conventional = format!("{fragment}{SECTION_ID_SUFFIX}");
    let found = [conventional.as_str(), fragment]
        .into_iter()
        .find_map(|id| element_by_id(document, id));
    found
}

fn element_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().id() == Some(id))
}

/// Root element that media and commentary are scoped to, and whether the
/// fragment actually matched a section.
pub fn scope_root<'a>(document: &'a Html, fragment: Option<&str>) -> (ElementRef<'a>, bool) {
    match fragment.and_then(|f| find_section(document, f)) {
        Some(section) => (section, true),
        None => (document.root_element(), false),
    }
}

pub fn sections_in(document: &Html) -> Vec<PageSection> {
    document
        .select(&SECTION_SELECTOR)
        .filter_map(|el| el.value().id())
        .map(|id| PageSection {
            name: id.strip_suffix(SECTION_ID_SUFFIX).unwrap_or(id).to_string(),
            element_id: id.to_string(),
        })
        .collect()
}

/// Media under `root` in document order, first occurrence of each asset kept.
///
/// Two references differing only in their query string are the same asset.
pub fn media_in(root: ElementRef<'_>, base_url: &Url) -> Vec<MediaCandidate> {
    let mut seen = HashSet::new();
    let mut media = Vec::new();

    for element in root.select(&MEDIA_SELECTOR) {
        let Some((url, kind)) = media_reference(element, base_url) else {
            continue;
        };
        if seen.insert(utils::dedup_key(&url)) {
            let index = media.len();
            media.push(MediaCandidate::new(url, kind, index));
        }
    }

    media
}

/// The absolute source of an `<img>` or `<video>`, if it has a usable one.
pub fn media_reference(element: ElementRef<'_>, base_url: &Url) -> Option<(Url, MediaKind)> {
    match element.value().name() {
        "img" => effective_source(element, base_url).map(|url| (url, MediaKind::Image)),
        "video" => video_source(element, base_url).map(|url| (url, MediaKind::Video)),
        _ => None,
    }
}

/// First usable source attribute, lazy-load attribute first. Inline `data:`
/// sources are skipped.
pub fn effective_source(element: ElementRef<'_>, base_url: &Url) -> Option<Url> {
    SOURCE_ATTRIBUTES
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .find_map(|raw| utils::resolve_source(base_url, raw))
}

/// A video's own media URL: its source attributes, else its first `<source>`.
/// The `poster` image is deliberately not considered.
fn video_source(element: ElementRef<'_>, base_url: &Url) -> Option<Url> {
    effective_source(element, base_url).or_else(|| {
        element
            .select(&SOURCE_SELECTOR)
            .find_map(|source| effective_source(source, base_url))
    })
}
