//! Image variant resolution.
//!
//! Uploaded images are stored under a content-derived basename. When the
//! uploader kept a full-resolution copy, it sits next to the display copy
//! with `_original` inserted before the extension:
//!
//! ```text
//! assets/images/gallery21/a86d9fc4.jpg           display copy
//! assets/images/gallery21/a86d9fc4_original.jpg  full resolution
//! ```
//!
//! Resolution probes for that sibling and prefers it. A failed probe is not
//! an error: the display copy is kept.

use crate::constants::ORIGINAL_SUFFIX;
use crate::error::FetchError;
use crate::fetcher::PageFetcher;
use crate::gallery::{MediaCandidate, MediaKind};
use crate::options::ExtractorOptions;
use crate::utils;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;
use url::Url;

fn split_filename(url: &Url) -> Option<(&str, &str, &str)> {
    let (dir, file) = url.path().rsplit_once('/')?;
    let dot = file.rfind('.').filter(|&i| i > 0)?;
    Some((dir, &file[..dot], &file[dot..]))
}

/// Whether `url` already names the full-resolution upload.
pub fn is_original_variant(url: &Url) -> bool {
    split_filename(url)
        .map(|(_, stem, _)| stem.ends_with(ORIGINAL_SUFFIX))
        .unwrap_or(false)
}

/// The `_original` sibling of `url`, without query string.
///
/// Returns `None` when `url` is already the original or has no extension.
pub fn original_variant(url: &Url) -> Option<Url> {
    let (dir, stem, ext) = split_filename(url)?;
    if stem.ends_with(ORIGINAL_SUFFIX) {
        return None;
    }
    let path = format!("{dir}/{stem}{ORIGINAL_SUFFIX}{ext}");
    let mut sibling = utils::strip_query(url);
    sibling.set_path(&path);
    Some(sibling)
}

async fn probe(fetcher: &dyn PageFetcher, candidate: &Url, timeout: Option<Duration>) -> bool {
    let check = fetcher.exists(candidate.as_str());
    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, check)
            .await
            .unwrap_or_else(|_| Err(FetchError::Timeout(candidate.to_string()))),
        None => check.await,
    };

    match outcome {
        Ok(found) => {
            debug!(url = %candidate, found, "probed original variant");
            found
        }
        Err(err) => {
            debug!(url = %candidate, error = %err, "original variant probe failed, keeping display copy");
            false
        }
    }
}

/// Resolve an image URL to its highest-fidelity variant.
///
/// The result never carries the query string. Already-original URLs are
/// returned without probing.
pub async fn resolve_variant(
    fetcher: &dyn PageFetcher,
    raw_image_url: &Url,
    timeout: Option<Duration>,
) -> Url {
    if let Some(sibling) = original_variant(raw_image_url) {
        if probe(fetcher, &sibling, timeout).await {
            return sibling;
        }
    }
    utils::strip_query(raw_image_url)
}

/// Resolve every candidate with bounded parallelism, keeping input order.
///
/// Videos are never probed; only uploaded images have originals.
pub async fn resolve_all(
    fetcher: &dyn PageFetcher,
    candidates: Vec<MediaCandidate>,
    options: &ExtractorOptions,
) -> Vec<MediaCandidate> {
    let timeout = options.probe_timeout;
    let probe_originals = options.probe_originals;

    stream::iter(candidates.into_iter().map(|mut candidate| async move {
        candidate.resolved_url = match candidate.kind {
            MediaKind::Image if probe_originals => {
                resolve_variant(fetcher, &candidate.raw_url, timeout).await
            }
            _ => utils::strip_query(&candidate.raw_url),
        };
        candidate
    }))
    .buffered(options.probe_concurrency.max(1))
    .collect()
    .await
}

/// Drop candidates whose resolved URL was already seen, keeping the first.
pub fn dedup_resolved(media: Vec<MediaCandidate>) -> Vec<MediaCandidate> {
    let mut seen = HashSet::new();
    media
        .into_iter()
        .filter(|m| seen.insert(utils::dedup_key(&m.resolved_url)))
        .collect()
}

/// Lookup from a raw asset URL to the URL it resolved to.
#[derive(Debug, Clone, Default)]
pub struct MediaIndex {
    resolved: HashMap<String, Url>,
}

impl MediaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_candidates(candidates: &[MediaCandidate]) -> Self {
        let mut index = Self::new();
        for candidate in candidates {
            index.insert(&candidate.raw_url, candidate.resolved_url.clone());
        }
        index
    }

    pub fn insert(&mut self, raw: &Url, resolved: Url) {
        self.resolved.entry(utils::dedup_key(raw)).or_insert(resolved);
    }

    pub fn get(&self, raw: &Url) -> Option<&Url> {
        self.resolved.get(&utils::dedup_key(raw))
    }

    /// The resolved URL for `raw`, or `raw` without its query when unknown.
    pub fn resolve(&self, raw: &Url) -> Url {
        self.get(raw)
            .cloned()
            .unwrap_or_else(|| utils::strip_query(raw))
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StaticFetcher;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_original_variant_path() {
        let sibling = original_variant(&url(
            "https://caminukai-art.carrd.co/assets/images/gallery21/a86d9fc4.jpg?v=3850522b",
        ))
        .unwrap();
        assert_eq!(
            sibling.as_str(),
            "https://caminukai-art.carrd.co/assets/images/gallery21/a86d9fc4_original.jpg"
        );

        let cover = original_variant(&url("https://rosymiz.carrd.co/assets/videos/video02.mp4.jpg"));
        assert_eq!(
            cover.unwrap().as_str(),
            "https://rosymiz.carrd.co/assets/videos/video02.mp4_original.jpg"
        );
    }

    #[test]
    fn test_original_variant_of_original_is_none() {
        let original = url("https://caminukai-art.carrd.co/assets/images/gallery13/ddc31be4_original.jpg?v=3850522b");
        assert!(is_original_variant(&original));
        assert!(original_variant(&original).is_none());
        assert!(original_variant(&url("https://a.carrd.co/assets/images/noext")).is_none());
        assert!(original_variant(&url("https://a.carrd.co/assets/images/.hidden")).is_none());
    }

    #[tokio::test]
    async fn test_resolve_prefers_existing_original() {
        let fetcher = StaticFetcher::new().with_asset(
            "https://caminukai-art.carrd.co/assets/images/gallery21/a86d9fc4_original.jpg",
        );
        let resolved = resolve_variant(
            &fetcher,
            &url("https://caminukai-art.carrd.co/assets/images/gallery21/a86d9fc4.jpg?v=3850522b"),
            None,
        )
        .await;
        assert_eq!(
            resolved.as_str(),
            "https://caminukai-art.carrd.co/assets/images/gallery21/a86d9fc4_original.jpg"
        );
    }

    #[tokio::test]
    async fn test_resolve_without_original_strips_query() {
        let fetcher = StaticFetcher::new();
        let resolved = resolve_variant(
            &fetcher,
            &url("https://rosymiz.carrd.co/assets/images/gallery01/1a19b400.jpg?v=c6f079b5"),
            None,
        )
        .await;
        assert_eq!(
            resolved.as_str(),
            "https://rosymiz.carrd.co/assets/images/gallery01/1a19b400.jpg"
        );
    }

    #[tokio::test]
    async fn test_already_original_is_not_probed() {
        let fetcher = StaticFetcher::new();
        let resolved = resolve_variant(
            &fetcher,
            &url("https://caminukai-art.carrd.co/assets/images/gallery13/ddc31be4_original.jpg?v=3850522b"),
            None,
        )
        .await;
        assert_eq!(
            resolved.as_str(),
            "https://caminukai-art.carrd.co/assets/images/gallery13/ddc31be4_original.jpg"
        );
        assert!(fetcher.probes().is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_falls_back() {
        let fetcher = StaticFetcher::new()
            .with_broken_probe("https://a.carrd.co/assets/images/gallery01/x_original.jpg");
        let resolved = resolve_variant(
            &fetcher,
            &url("https://a.carrd.co/assets/images/gallery01/x.jpg?v=1"),
            None,
        )
        .await;
        assert_eq!(resolved.as_str(), "https://a.carrd.co/assets/images/gallery01/x.jpg");
    }

    #[tokio::test]
    async fn test_probe_timeout_falls_back() {
        let sibling = "https://a.carrd.co/assets/images/gallery01/x_original.jpg";
        let fetcher = StaticFetcher::new()
            .with_asset(sibling)
            .with_probe_delay(sibling, Duration::from_secs(5));
        let resolved = resolve_variant(
            &fetcher,
            &url("https://a.carrd.co/assets/images/gallery01/x.jpg"),
            Some(Duration::from_millis(20)),
        )
        .await;
        assert_eq!(resolved.as_str(), "https://a.carrd.co/assets/images/gallery01/x.jpg");
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_document_order() {
        let slow = "https://a.carrd.co/assets/images/gallery01/a_original.jpg";
        let fetcher = StaticFetcher::new()
            .with_asset(slow)
            .with_probe_delay(slow, Duration::from_millis(50))
            .with_asset("https://a.carrd.co/assets/images/gallery01/c_original.jpg");

        let candidates = vec![
            MediaCandidate::new(url("https://a.carrd.co/assets/images/gallery01/a.jpg?v=1"), MediaKind::Image, 0),
            MediaCandidate::new(url("https://a.carrd.co/assets/videos/video01.mp4?v=1"), MediaKind::Video, 1),
            MediaCandidate::new(url("https://a.carrd.co/assets/images/gallery01/b.jpg?v=1"), MediaKind::Image, 2),
            MediaCandidate::new(url("https://a.carrd.co/assets/images/gallery01/c.jpg?v=1"), MediaKind::Image, 3),
        ];
        let options = ExtractorOptions::builder().probe_concurrency(4).build();
        let resolved = resolve_all(&fetcher, candidates, &options).await;

        let urls: Vec<&str> = resolved.iter().map(|m| m.resolved_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://a.carrd.co/assets/images/gallery01/a_original.jpg",
                "https://a.carrd.co/assets/videos/video01.mp4",
                "https://a.carrd.co/assets/images/gallery01/b.jpg",
                "https://a.carrd.co/assets/images/gallery01/c_original.jpg",
            ]
        );
        assert!(!fetcher.probes().iter().any(|p| p.contains("video01")));
    }

    #[tokio::test]
    async fn test_probing_can_be_disabled() {
        let fetcher = StaticFetcher::new()
            .with_asset("https://a.carrd.co/assets/images/gallery01/a_original.jpg");
        let candidates = vec![MediaCandidate::new(
            url("https://a.carrd.co/assets/images/gallery01/a.jpg?v=1"),
            MediaKind::Image,
            0,
        )];
        let options = ExtractorOptions::builder().probe_originals(false).build();
        let resolved = resolve_all(&fetcher, candidates, &options).await;
        assert_eq!(
            resolved[0].resolved_url.as_str(),
            "https://a.carrd.co/assets/images/gallery01/a.jpg"
        );
        assert!(fetcher.probes().is_empty());
    }

    #[test]
    fn test_dedup_by_resolved_url() {
        let mut thumb = MediaCandidate::new(url("https://a.carrd.co/assets/images/g/x.jpg?v=1"), MediaKind::Image, 0);
        thumb.resolved_url = url("https://a.carrd.co/assets/images/g/x_original.jpg");
        let full = MediaCandidate::new(url("https://a.carrd.co/assets/images/g/x_original.jpg?v=1"), MediaKind::Image, 1);
        let other = MediaCandidate::new(url("https://a.carrd.co/assets/images/g/y.jpg"), MediaKind::Image, 2);

        let media = dedup_resolved(vec![thumb, full, other]);
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].order_index, 0);
        assert_eq!(media[1].order_index, 2);
    }

    #[test]
    fn test_media_index_fallback() {
        let mut candidate = MediaCandidate::new(url("https://a.carrd.co/assets/images/g/x.jpg?v=1"), MediaKind::Image, 0);
        candidate.resolved_url = url("https://a.carrd.co/assets/images/g/x_original.jpg");
        let index = MediaIndex::from_candidates(&[candidate]);

        assert_eq!(
            index.resolve(&url("https://a.carrd.co/assets/images/g/x.jpg?v=2")).as_str(),
            "https://a.carrd.co/assets/images/g/x_original.jpg"
        );
        assert_eq!(
            index.resolve(&url("https://a.carrd.co/assets/images/g/z.jpg?v=2")).as_str(),
            "https://a.carrd.co/assets/images/g/z.jpg"
        );
        assert_eq!(index.len(), 1);
    }
}
