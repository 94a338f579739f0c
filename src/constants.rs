//! Platform conventions and precompiled patterns.

use once_cell::sync::Lazy;
use regex::Regex;

/// Filename suffix the platform gives to the full-resolution upload.
pub const ORIGINAL_SUFFIX: &str = "_original";

/// Suffix appended to a section's fragment name to form its element id.
pub const SECTION_ID_SUFFIX: &str = "-section";

/// Attributes holding an element's source, lazy-load attribute first.
pub const SOURCE_ATTRIBUTES: [&str; 2] = ["data-src", "src"];

/// Platform subdomain labels that belong to the platform itself rather than a user.
pub const RESERVED_SUBDOMAINS: [&str; 3] = ["www", "app", "help"];

pub struct Regexps {
    /// `{name}.carrd.co` / `{name}.crd.co`, capturing `name`
    pub platform_host: Regex,
    /// Media file under the site's assets directory
    pub asset_path: Regex,
    /// Anything else under the assets directory
    pub assets_dir: Regex,
    pub video_extension: Regex,
}

pub static REGEXPS: Lazy<Regexps> = Lazy::new(|| Regexps {
    platform_host: Regex::new(r"(?i)^([a-z0-9](?:[a-z0-9-]*[a-z0-9])?)\.(?:carrd|crd)\.co$").unwrap(),
    asset_path: Regex::new(
        r"(?i)^/assets/(?:images|videos)/(?:[^/]+/)*[^/]+\.(?:jpe?g|png|gif|webp|avif|svg|mp4|webm|mov|m4v)$",
    )
    .unwrap(),
    assets_dir: Regex::new(r"(?i)^/assets/").unwrap(),
    video_extension: Regex::new(r"(?i)\.(?:mp4|webm|mov|m4v)$").unwrap(),
});
