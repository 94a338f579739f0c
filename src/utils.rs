//! Small URL and text helpers shared by the extraction stages.

use crate::constants::REGEXPS;
use url::Url;

/// Returns a copy of `url` without its query string and fragment.
pub fn strip_query(url: &Url) -> Url {
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.set_fragment(None);
    stripped
}

/// Key used when comparing asset URLs: query and fragment never distinguish two assets.
pub fn dedup_key(url: &Url) -> String {
    strip_query(url).into()
}

/// Whether a source attribute carries inline binary data instead of a network reference.
pub fn is_data_url(value: &str) -> bool {
    value
        .trim_start()
        .get(..5)
        .map(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .unwrap_or(false)
}

pub fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Resolve a media source attribute against the page URL.
///
/// Empty values, inline `data:` sources and non-web schemes yield `None`.
pub fn resolve_source(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || is_data_url(raw) {
        return None;
    }
    base.join(raw).ok().filter(is_web_scheme)
}

/// Resolve an anchor `href` against the page URL. `mailto:` links are kept.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let resolved = base.join(href.trim()).ok()?;
    (is_web_scheme(&resolved) || resolved.scheme() == "mailto").then_some(resolved)
}

/// `scheme://host[:port]` of the site serving `url`, without a trailing slash.
pub fn site_root(url: &Url) -> String {
    url.origin().ascii_serialization()
}

pub fn is_video_path(url: &Url) -> bool {
    REGEXPS.video_extension.is_match(url.path())
}

/// Collapse runs of source-formatting whitespace to one space.
///
/// Non-breaking spaces are author-entered, so they survive as plain spaces
/// instead of being folded into the surrounding run.
pub fn collapse_source_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
            continue;
        }
        in_run = false;
        out.push(if ch == '\u{a0}' { ' ' } else { ch });
    }
    out
}

/// Collapse all whitespace, including non-breaking spaces, to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
