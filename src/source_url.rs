//! URL classification for Carrd sites.
//!
//! Classification is a pure function over an explicit, ordered rule table. It
//! never fails: anything that is not a web URL on a recognized site becomes
//! [`UrlKind::Unclassified`].
//!
//! ```rust
//! use carrdrs::{classify, UrlKind};
//!
//! assert_eq!(classify("https://rosymiz.carrd.co/assets/images/gallery01/1a19b400.jpg?v=c6f079b5").kind, UrlKind::Image);
//! assert_eq!(classify("https://caminukai-art.carrd.co/#home").kind, UrlKind::Page);
//! assert_eq!(classify("https://caminukai-art.carrd.co#").kind, UrlKind::Profile);
//! assert_eq!(classify("https://example.com/#home").kind, UrlKind::Unclassified);
//! ```

use crate::constants::{REGEXPS, RESERVED_SUBDOMAINS};
use crate::utils;
use serde::{Deserialize, Serialize};
use url::Url;

/// What a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlKind {
    /// A file under the site's assets directory
    Image,
    /// A page, usually anchored to a section with a `#fragment`
    Page,
    /// The bare site root
    Profile,
    Unclassified,
}

/// The kind of host serving a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    /// `{name}.carrd.co` or `{name}.crd.co`
    Subdomain { name: String },
    /// An independently owned domain known to be served by the platform
    CustomDomain { host: String },
}

/// A classified URL. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    pub kind: UrlKind,
    /// Query-stripped form for pages and profiles; images keep their query
    /// because the version token is needed to fetch them.
    pub canonical_form: String,
    pub original: String,
    site: Option<Site>,
    parsed: Option<Url>,
}

impl SourceUrl {
    fn unclassified(input: &str, parsed: Option<Url>) -> Self {
        Self {
            kind: UrlKind::Unclassified,
            canonical_form: input.trim().to_string(),
            original: input.to_string(),
            site: None,
            parsed,
        }
    }

    pub fn site(&self) -> Option<&Site> {
        self.site.as_ref()
    }

    /// The parsed URL, if the input was a valid absolute URL.
    pub fn url(&self) -> Option<&Url> {
        self.parsed.as_ref()
    }

    pub fn is_image(&self) -> bool {
        self.kind == UrlKind::Image
    }

    pub fn is_page(&self) -> bool {
        self.kind == UrlKind::Page
    }

    pub fn is_profile(&self) -> bool {
        self.kind == UrlKind::Profile
    }

    pub fn is_subdomain(&self) -> bool {
        matches!(self.site, Some(Site::Subdomain { .. }))
    }

    /// Subdomain label, when the site lives on a platform subdomain.
    pub fn subdomain(&self) -> Option<&str> {
        match &self.site {
            Some(Site::Subdomain { name }) => Some(name),
            _ => None,
        }
    }

    /// The section name carried by the URL's fragment, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.parsed
            .as_ref()
            .and_then(Url::fragment)
            .filter(|fragment| !fragment.is_empty())
    }

    /// `scheme://host` of a recognized site.
    pub fn site_root(&self) -> Option<String> {
        self.site.as_ref()?;
        self.parsed.as_ref().map(utils::site_root)
    }

    /// Identity used for equality between asset URLs: the query never matters.
    pub fn dedup_key(&self) -> String {
        match &self.parsed {
            Some(url) => utils::dedup_key(url),
            None => self.canonical_form.clone(),
        }
    }

    /// Whether two URLs are served by the same site.
    pub fn same_site(&self, other: &SourceUrl) -> bool {
        self.site.is_some() && self.site_root() == other.site_root()
    }

    /// The URL to request when fetching this page (no fragment, no query).
    pub fn fetch_url(&self) -> Option<Url> {
        self.parsed.as_ref().map(utils::strip_query)
    }
}

/// One row of the classification table.
struct UrlRule {
    kind: UrlKind,
    matches: fn(&Url) -> bool,
}

/// Evaluated top to bottom after the host is recognized; the first match wins.
const RULES: &[UrlRule] = &[
    UrlRule {
        kind: UrlKind::Image,
        matches: is_asset_file,
    },
    UrlRule {
        kind: UrlKind::Unclassified,
        matches: is_other_asset,
    },
    UrlRule {
        kind: UrlKind::Profile,
        matches: is_site_root,
    },
    UrlRule {
        kind: UrlKind::Page,
        matches: any_path,
    },
];

fn is_asset_file(url: &Url) -> bool {
    REGEXPS.asset_path.is_match(url.path())
}

fn is_other_asset(url: &Url) -> bool {
    REGEXPS.assets_dir.is_match(url.path())
}

fn is_site_root(url: &Url) -> bool {
    url.path() == "/" && url.fragment().map_or(true, str::is_empty)
}

fn any_path(_: &Url) -> bool {
    true
}

/// Classifies URLs against the platform's hosts plus any configured custom domains.
#[derive(Debug, Clone, Default)]
pub struct UrlClassifier {
    custom_domains: Vec<String>,
}

impl UrlClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognize `domains` (and their `www.` forms) as platform-hosted sites.
    pub fn with_custom_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let custom_domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { custom_domains }
    }

    /// Which platform site, if any, serves `url`.
    pub fn site_for(&self, url: &Url) -> Option<Site> {
        if !utils::is_web_scheme(url) {
            return None;
        }
        let host = url.host_str()?.to_ascii_lowercase();

        if let Some(caps) = REGEXPS.platform_host.captures(&host) {
            let name = caps.get(1)?.as_str();
            if RESERVED_SUBDOMAINS.contains(&name) {
                return None;
            }
            return Some(Site::Subdomain {
                name: name.to_string(),
            });
        }

        let bare = host.strip_prefix("www.").unwrap_or(&host);
        self.custom_domains
            .iter()
            .any(|d| d == &host || d == bare)
            .then(|| Site::CustomDomain { host })
    }

    pub fn classify(&self, input: &str) -> SourceUrl {
        let parsed = match Url::parse(input.trim()) {
            Ok(url) => url,
            Err(_) => return SourceUrl::unclassified(input, None),
        };

        let Some(site) = self.site_for(&parsed) else {
            return SourceUrl::unclassified(input, Some(parsed));
        };

        let kind = RULES
            .iter()
            .find(|rule| (rule.matches)(&parsed))
            .map(|rule| rule.kind)
            .unwrap_or(UrlKind::Unclassified);

        let canonical_form = match kind {
            UrlKind::Image => {
                let mut url = parsed.clone();
                url.set_fragment(None);
                url.into()
            }
            UrlKind::Page => {
                let mut url = parsed.clone();
                url.set_query(None);
                url.into()
            }
            UrlKind::Profile => utils::site_root(&parsed),
            UrlKind::Unclassified => input.trim().to_string(),
        };

        SourceUrl {
            kind,
            canonical_form,
            original: input.to_string(),
            site: Some(site),
            parsed: Some(parsed),
        }
    }

    pub fn is_image_url(&self, url: &str) -> bool {
        self.classify(url).is_image()
    }

    pub fn is_page_url(&self, url: &str) -> bool {
        self.classify(url).is_page()
    }

    pub fn is_profile_url(&self, url: &str) -> bool {
        self.classify(url).is_profile()
    }
}

/// Classify `url` against the platform subdomains only.
pub fn classify(url: &str) -> SourceUrl {
    UrlClassifier::default().classify(url)
}

pub fn is_image_url(url: &str) -> bool {
    classify(url).is_image()
}

pub fn is_page_url(url: &str) -> bool {
    classify(url).is_page()
}

pub fn is_profile_url(url: &str) -> bool {
    classify(url).is_profile()
}
