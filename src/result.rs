//! The extraction result handed to the catalog pipeline.
//!
//! ## Example
//!
//! ```rust,no_run
//! use carrdrs::{CarrdExtractor, ExtractionStrategy, HttpFetcher};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = CarrdExtractor::new(Arc::new(HttpFetcher::new()?), None);
//! let result = extractor.extract("https://lytell.carrd.co/#portfolio", None).await?;
//!
//! println!("Artist: {:?}", result.username);
//! for url in result.media_urls() {
//!     println!("{url}");
//! }
//! println!("{}", result.commentary_body);
//! # Ok(())
//! # }
//! ```

use crate::commentary::Commentary;
use crate::gallery::MediaCandidate;
use crate::profile::Profile;
use serde::{Deserialize, Serialize};

/// Everything extracted from one input URL.
///
/// Every field has a defined absence: optional fields are `None`, collections
/// are empty and commentary strings are `""`. A page with no recognizable
/// gallery markup is a valid result with empty `media`, not an error.
///
/// ## Serialization
///
/// ```rust
/// use carrdrs::ExtractionResult;
///
/// let result = ExtractionResult::default();
/// let json = serde_json::to_string(&result).unwrap();
/// assert!(json.contains("\"page_url\":null"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// The page the media was found on.
    ///
    /// `None` when the input was a bare asset URL with no referring page.
    pub page_url: Option<String>,

    /// `scheme://host` root of the site.
    ///
    /// `None` when no site identity can be established, for example a
    /// custom-domain asset seen without its page.
    pub profile_url: Option<String>,

    /// The artist's handle. Only platform subdomains provide one.
    pub username: Option<String>,

    /// Display name declared by the page's own metadata, if any.
    pub display_name: Option<String>,

    /// Alternative names for the artist, without duplicates.
    pub other_names: Vec<String>,

    /// Media in page order, one entry per resolved URL.
    pub media: Vec<MediaCandidate>,

    /// Promoted title heading, `""` when none was promoted.
    pub commentary_title: String,

    /// Commentary in normalized markup, `""` when the page has no text.
    pub commentary_body: String,
}

impl ExtractionResult {
    pub(crate) fn new(page_url: Option<String>, profile: Profile, media: Vec<MediaCandidate>) -> Self {
        let mut other_names: Vec<String> = Vec::with_capacity(profile.other_names.len());
        for name in profile.other_names {
            if !other_names.contains(&name) {
                other_names.push(name);
            }
        }

        Self {
            page_url,
            profile_url: profile.profile_url,
            username: profile.username,
            display_name: profile.display_name,
            other_names,
            media,
            commentary_title: String::new(),
            commentary_body: String::new(),
        }
    }

    pub(crate) fn with_commentary(mut self, commentary: Commentary) -> Self {
        self.commentary_title = commentary.title;
        self.commentary_body = commentary.body;
        self
    }

    /// Resolved media URLs in page order.
    pub fn media_urls(&self) -> Vec<&str> {
        self.media.iter().map(|m| m.resolved_url.as_str()).collect()
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub fn has_commentary(&self) -> bool {
        !self.commentary_title.is_empty() || !self.commentary_body.is_empty()
    }
}
