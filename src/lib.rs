//! # carrdrs
//!
//! Extraction of artist portfolios hosted on Carrd (`carrd.co`, `crd.co` and
//! custom domains served by the platform).
//!
//! ## Overview
//!
//! Given any URL a user might paste (a direct asset URL, a page anchored to a
//! section, or a bare profile URL), carrdrs classifies it, fetches the page,
//! and returns an ordered, deduplicated list of media references together with
//! the artist's identity and the page's commentary converted to a
//! line-oriented markup.
//!
//! ## Key Features
//!
//! - **URL Classification**: pure, table-driven mapping to image, page, profile or unclassified
//! - **Gallery Extraction**: lazy-loaded images, galleries and videos in document order
//! - **Original Variants**: probes for the full-resolution `_original` upload, with bounded concurrency
//! - **Commentary Normalization**: headings, emphasis, links, lists and media as markup tokens
//! - **Profile Resolution**: username from the subdomain, display name from page metadata
//! - **Pluggable Fetching**: bring your own [`PageFetcher`], or use [`HttpFetcher`]
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use carrdrs::{CarrdExtractor, ExtractionStrategy, HttpFetcher};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = CarrdExtractor::new(Arc::new(HttpFetcher::new()?), None);
//! let result = extractor.extract("https://lytell.carrd.co/#portfolio", None).await?;
//!
//! println!("Profile: {:?}", result.profile_url);
//! println!("Media: {:?}", result.media_urls());
//! println!("{}", result.commentary_body);
//! # Ok(())
//! # }
//! ```
//!
//! ## Classification Only
//!
//! Classification never touches the network:
//!
//! ```rust
//! use carrdrs::{is_image_url, is_page_url, is_profile_url};
//!
//! assert!(is_image_url("https://rosymiz.carrd.co/assets/images/gallery01/1a19b400.jpg?v=c6f079b5"));
//! assert!(is_page_url("https://caminukai-art.carrd.co/#home"));
//! assert!(is_profile_url("https://caminukai-art.carrd.co#"));
//! ```
//!
//! ## Custom Options
//!
//! ```rust,no_run
//! use carrdrs::{CarrdExtractor, ExtractorOptions, HttpFetcher, TitlePolicy};
//! use std::sync::Arc;
//!
//! # fn build() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ExtractorOptions::builder()
//!     .custom_domains(vec!["hyphensam.com".to_string()])
//!     .probe_concurrency(4)
//!     .title_policy(TitlePolicy::FirstTopLevelHeading)
//!     .build();
//!
//! let extractor = CarrdExtractor::new(Arc::new(HttpFetcher::new()?), Some(options));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Only a failed fetch of the primary page is an error. Pages without
//! recognizable gallery markup, missing sections and failed variant probes
//! all produce a best-effort result.
//!
//! ```rust,no_run
//! use carrdrs::{CarrdError, CarrdExtractor, ExtractionStrategy, HttpFetcher};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = CarrdExtractor::new(Arc::new(HttpFetcher::new()?), None);
//!
//! match extractor.extract("https://nobody.carrd.co/#home", None).await {
//!     Ok(result) => println!("{} media", result.media.len()),
//!     Err(CarrdError::FetchFailure { url, source }) => {
//!         eprintln!("could not fetch {}: {}", url, source);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Events are emitted through [`tracing`]: fetch failures at `warn`, pages
//! without gallery markup at `info`, probe outcomes and section fallbacks at
//! `debug`. Install any subscriber to see them.

mod commentary;
mod constants;
mod error;
mod extractor;
mod fetcher;
mod gallery;
mod options;
mod profile;
mod registry;
mod resolver;
mod result;
mod source_url;
mod utils;

// Public exports
pub use commentary::{normalize, normalize_section, Commentary};
pub use error::{CarrdError, FetchError, Result};
pub use extractor::{CarrdExtractor, ExtractionStrategy};
pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher, StaticFetcher};
pub use gallery::{extract_gallery, find_section, Gallery, MediaCandidate, MediaKind, PageSection};
pub use options::{ExtractorOptions, ExtractorOptionsBuilder, TitlePolicy};
pub use profile::{identity_marker, resolve_profile, Profile};
pub use registry::StrategyRegistry;
pub use resolver::{is_original_variant, original_variant, resolve_all, resolve_variant, MediaIndex};
pub use result::ExtractionResult;
pub use source_url::{
    classify, is_image_url, is_page_url, is_profile_url, Site, SourceUrl, UrlClassifier, UrlKind,
};
