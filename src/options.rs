//! Configuration options for Carrd extraction.
//!
//! This module provides [`ExtractorOptions`] and [`ExtractorOptionsBuilder`]
//! for configuring which hosts are recognized, how image variants are probed,
//! and how commentary titles are chosen.
//!
//! ## Example
//!
//! ```rust
//! use carrdrs::{ExtractorOptions, TitlePolicy};
//! use std::time::Duration;
//!
//! let options = ExtractorOptions::builder()
//!     .custom_domains(vec!["hyphensam.com".to_string()])
//!     .probe_concurrency(4)
//!     .probe_timeout(Some(Duration::from_secs(5)))
//!     .title_policy(TitlePolicy::FirstTopLevelHeading)
//!     .build();
//!
//! assert_eq!(options.probe_concurrency, 4);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which heading, if any, is promoted to the commentary title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitlePolicy {
    /// Headings stay in the body; the title is always empty.
    #[default]
    Inline,
    /// The first `<h1>` of the selected section becomes the title and is
    /// left out of the body.
    FirstTopLevelHeading,
}

/// Configuration options for the Carrd extractor.
///
/// Options deserialize with defaults for missing fields, so a caller can keep
/// them in its own configuration file.
///
/// ```rust
/// use carrdrs::ExtractorOptions;
///
/// let options: ExtractorOptions =
///     serde_json::from_str(r#"{ "custom_domains": ["hyphensam.com"] }"#).unwrap();
/// assert!(options.probe_originals);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorOptions {
    /// Independently owned domains known to be served by the platform.
    ///
    /// Default: empty
    pub custom_domains: Vec<String>,

    /// Probe for `_original` siblings of gallery images.
    ///
    /// Default: `true`
    pub probe_originals: bool,

    /// Maximum number of probes in flight for one page.
    ///
    /// Default: `8`
    pub probe_concurrency: usize,

    /// Deadline for a single probe. A probe that runs out of time counts as
    /// "not found".
    ///
    /// Default: 10 seconds
    pub probe_timeout: Option<Duration>,

    /// How the commentary title is chosen.
    ///
    /// Default: [`TitlePolicy::Inline`]
    pub title_policy: TitlePolicy,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            custom_domains: Vec::new(),
            probe_originals: true,
            probe_concurrency: 8,
            probe_timeout: Some(Duration::from_secs(10)),
            title_policy: TitlePolicy::Inline,
        }
    }
}

impl ExtractorOptions {
    /// Creates a new builder for ExtractorOptions
    pub fn builder() -> ExtractorOptionsBuilder {
        ExtractorOptionsBuilder::default()
    }
}

/// Builder for [`ExtractorOptions`].
#[derive(Default)]
pub struct ExtractorOptionsBuilder {
    custom_domains: Option<Vec<String>>,
    probe_originals: Option<bool>,
    probe_concurrency: Option<usize>,
    probe_timeout: Option<Option<Duration>>,
    title_policy: Option<TitlePolicy>,
}

impl ExtractorOptionsBuilder {
    /// Set custom domains served by the platform
    pub fn custom_domains(mut self, domains: Vec<String>) -> Self {
        self.custom_domains = Some(domains);
        self
    }

    /// Enable or disable `_original` probing
    pub fn probe_originals(mut self, probe: bool) -> Self {
        self.probe_originals = Some(probe);
        self
    }

    /// Set the number of concurrent probes (at least 1)
    pub fn probe_concurrency(mut self, concurrency: usize) -> Self {
        self.probe_concurrency = Some(concurrency.max(1));
        self
    }

    /// Set the per-probe deadline; `None` relies on the fetcher alone
    pub fn probe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Set the title policy
    pub fn title_policy(mut self, policy: TitlePolicy) -> Self {
        self.title_policy = Some(policy);
        self
    }

    /// Build the ExtractorOptions
    pub fn build(self) -> ExtractorOptions {
        let defaults = ExtractorOptions::default();
        ExtractorOptions {
            custom_domains: self.custom_domains.unwrap_or(defaults.custom_domains),
            probe_originals: self.probe_originals.unwrap_or(defaults.probe_originals),
            probe_concurrency: self
                .probe_concurrency
                .unwrap_or(defaults.probe_concurrency),
            probe_timeout: self.probe_timeout.unwrap_or(defaults.probe_timeout),
            title_policy: self.title_policy.unwrap_or(defaults.title_policy),
        }
    }
}
