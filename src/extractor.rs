//! The Carrd extraction strategy.
//!
//! Control flow for one input URL:
//!
//! 1. Classify the URL.
//! 2. Pages and profiles: fetch the page, scope to the section named by the
//!    fragment, collect media, resolve `_original` variants, normalize the
//!    commentary and derive the identity.
//! 3. Images: resolve the single asset. When a referring page on the same
//!    site is known, the page supplies the context (identity, commentary).
//!
//! Only a failed fetch of the primary page is an error. Everything else
//! degrades to a populated result.

use crate::commentary::{self, Commentary};
use crate::error::{CarrdError, Result};
use crate::fetcher::PageFetcher;
use crate::gallery::{self, MediaCandidate, MediaKind};
use crate::options::{ExtractorOptions, TitlePolicy};
use crate::profile::{self, Profile};
use crate::resolver::{self, MediaIndex};
use crate::result::ExtractionResult;
use crate::source_url::{Site, SourceUrl, UrlClassifier, UrlKind};
use crate::utils;
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// A per-platform extractor, selected by a
/// [`StrategyRegistry`](crate::StrategyRegistry) from the URL's host.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Whether this strategy is responsible for `url`.
    fn handles(&self, url: &str) -> bool;

    /// Extract everything `url` points at. `referer` is the page the URL was
    /// found on, when known.
    async fn extract(&self, url: &str, referer: Option<&str>) -> Result<ExtractionResult>;
}

/// What one parse of a page yields before any network work.
struct PageScan {
    media: Vec<MediaCandidate>,
    marker: Option<String>,
    matched_section: bool,
}

// `Html` is not `Send`, so each parse lives inside a synchronous helper and
// only owned data crosses an `.await`.
fn scan_page(html: &str, base_url: &Url, fragment: Option<&str>) -> PageScan {
    let document = Html::parse_document(html);
    let (root, matched_section) = gallery::scope_root(&document, fragment);
    PageScan {
        media: gallery::media_in(root, base_url),
        marker: profile::identity_marker(&document),
        matched_section,
    }
}

fn render_commentary(
    html: &str,
    base_url: &Url,
    fragment: Option<&str>,
    media_index: &MediaIndex,
    policy: TitlePolicy,
) -> Commentary {
    let document = Html::parse_document(html);
    let (root, _) = gallery::scope_root(&document, fragment);
    commentary::normalize_section(root, base_url, media_index, policy)
}

fn kind_of(url: &Url) -> MediaKind {
    if utils::is_video_path(url) {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

/// Extraction strategy for sites built on carrd.co / crd.co.
///
/// ```rust,no_run
/// use carrdrs::{CarrdExtractor, ExtractionStrategy, ExtractorOptions, HttpFetcher};
/// use std::sync::Arc;
///
/// # async fn run() -> carrdrs::Result<()> {
/// let fetcher = HttpFetcher::new().map_err(|e| carrdrs::CarrdError::Other(e.to_string()))?;
/// let options = ExtractorOptions::builder()
///     .custom_domains(vec!["hyphensam.com".to_string()])
///     .build();
/// let extractor = CarrdExtractor::new(Arc::new(fetcher), Some(options));
///
/// let result = extractor
///     .extract("https://rosymiz.carrd.co/assets/images/gallery01/1a19b400.jpg?v=c6f079b5",
///              Some("https://rosymiz.carrd.co/#home"))
///     .await?;
/// assert_eq!(result.media.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct CarrdExtractor {
    fetcher: Arc<dyn PageFetcher>,
    classifier: UrlClassifier,
    options: ExtractorOptions,
}

impl CarrdExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, options: Option<ExtractorOptions>) -> Self {
        let options = options.unwrap_or_default();
        let classifier = UrlClassifier::with_custom_domains(&options.custom_domains);
        Self {
            fetcher,
            classifier,
            options,
        }
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    pub fn classify(&self, url: &str) -> SourceUrl {
        self.classifier.classify(url)
    }

    async fn fetch_page(&self, page: &SourceUrl, referer: Option<&str>) -> Result<String> {
        let fetch_url = page
            .fetch_url()
            .ok_or_else(|| CarrdError::InvalidUrl(page.original.clone()))?;

        debug!(url = %fetch_url, referer, "fetching page");
        match self.fetcher.fetch(fetch_url.as_str(), referer).await {
            Ok(fetched) => {
                if !fetched.is_html() {
                    info!(
                        url = %fetch_url,
                        content_type = fetched.content_type.as_deref().unwrap_or(""),
                        "page is not HTML, extracting what is there"
                    );
                }
                Ok(fetched.text().into_owned())
            }
            Err(source) => {
                warn!(url = %fetch_url, error = %source, "page fetch failed");
                Err(CarrdError::FetchFailure {
                    url: page.canonical_form.clone(),
                    source,
                })
            }
        }
    }

    async fn resolve_asset(&self, raw: &Url) -> MediaCandidate {
        let kind = kind_of(raw);
        let mut candidate = MediaCandidate::new(raw.clone(), kind, 0);
        if kind == MediaKind::Image && self.options.probe_originals {
            candidate.resolved_url =
                resolver::resolve_variant(self.fetcher.as_ref(), raw, self.options.probe_timeout)
                    .await;
        }
        candidate
    }

    /// Fetch `page` and resolve every media reference in its scoped section.
    async fn load_page(
        &self,
        page: &SourceUrl,
        referer: Option<&str>,
    ) -> Result<(String, PageScan, Vec<MediaCandidate>)> {
        let base_url = page
            .url()
            .ok_or_else(|| CarrdError::InvalidUrl(page.original.clone()))?;
        let html = self.fetch_page(page, referer).await?;

        let mut scan = scan_page(&html, base_url, page.fragment());
        if let Some(fragment) = page.fragment().filter(|_| !scan.matched_section) {
            debug!(url = %page.canonical_form, fragment, "no section matches fragment, using whole page");
        }

        let candidates = std::mem::take(&mut scan.media);
        let resolved = resolver::resolve_all(self.fetcher.as_ref(), candidates, &self.options).await;
        Ok((html, scan, resolved))
    }

    async fn extract_page(&self, page: &SourceUrl, referer: Option<&str>) -> Result<ExtractionResult> {
        let (html, scan, resolved) = self.load_page(page, referer).await?;
        let base_url = page
            .url()
            .ok_or_else(|| CarrdError::InvalidUrl(page.original.clone()))?;

        let media_index = MediaIndex::from_candidates(&resolved);
        let commentary = render_commentary(
            &html,
            base_url,
            page.fragment(),
            &media_index,
            self.options.title_policy,
        );
        let profile = profile::profile_from(page, scan.marker, true);
        let media = resolver::dedup_resolved(resolved);

        if media.is_empty() && commentary.is_empty() {
            info!(url = %page.canonical_form, "no gallery markup or text found");
        }
        debug!(
            url = %page.canonical_form,
            media = media.len(),
            commentary = commentary.body.len(),
            "extracted page"
        );
        Ok(ExtractionResult::new(Some(page.canonical_form.clone()), profile, media)
            .with_commentary(commentary))
    }

    async fn extract_image(&self, image: &SourceUrl, referer: Option<&str>) -> Result<ExtractionResult> {
        let raw = image
            .url()
            .ok_or_else(|| CarrdError::InvalidUrl(image.original.clone()))?;

        let referring_page = referer
            .map(|referer| self.classifier.classify(referer))
            .filter(|page| (page.is_page() || page.is_profile()) && page.same_site(image));

        if let Some(page) = referring_page {
            // The referer only adds context, so losing it leaves a bare asset.
            match self.extract_image_in_page(image, raw, &page).await {
                Err(CarrdError::FetchFailure { url, source }) => {
                    warn!(
                        url = %image.canonical_form,
                        referer = %url,
                        error = %source,
                        "referer fetch failed, extracting asset alone"
                    );
                }
                result => return result,
            }
        }

        match image.site() {
            Some(Site::Subdomain { .. }) => {
                let asset = self.resolve_asset(raw).await;
                let profile = profile::profile_from(image, None, false);
                Ok(ExtractionResult::new(None, profile, vec![asset]))
            }
            _ => {
                // Custom-domain assets are taken exactly as given.
                let url = Url::parse(&image.canonical_form)
                    .map_err(|_| CarrdError::InvalidUrl(image.original.clone()))?;
                let kind = kind_of(&url);
                Ok(ExtractionResult::new(
                    None,
                    Profile::default(),
                    vec![MediaCandidate::verbatim(url, kind)],
                ))
            }
        }
    }

    async fn extract_image_in_page(
        &self,
        image: &SourceUrl,
        raw: &Url,
        page: &SourceUrl,
    ) -> Result<ExtractionResult> {
        let (html, scan, resolved) = self.load_page(page, None).await?;
        let base_url = page
            .url()
            .ok_or_else(|| CarrdError::InvalidUrl(page.original.clone()))?;
        let media_index = MediaIndex::from_candidates(&resolved);

        let asset = match resolved
            .into_iter()
            .find(|m| utils::dedup_key(&m.raw_url) == image.dedup_key())
        {
            Some(mut found) => {
                found.order_index = 0;
                found
            }
            None => self.resolve_asset(raw).await,
        };
        let commentary = render_commentary(
            &html,
            base_url,
            page.fragment(),
            &media_index,
            self.options.title_policy,
        );
        let profile = profile::profile_from(page, scan.marker, true);

        Ok(
            ExtractionResult::new(Some(page.canonical_form.clone()), profile, vec![asset])
                .with_commentary(commentary),
        )
    }

    fn pass_through(&self, source: &SourceUrl) -> Result<ExtractionResult> {
        let url = source
            .url()
            .filter(|url| utils::is_web_scheme(url))
            .cloned()
            .ok_or_else(|| CarrdError::InvalidUrl(source.original.clone()))?;
        debug!(url = %url, "unclassified url passed through");
        let kind = kind_of(&url);
        Ok(ExtractionResult::new(
            None,
            Profile::default(),
            vec![MediaCandidate::verbatim(url, kind)],
        ))
    }
}

#[async_trait]
impl ExtractionStrategy for CarrdExtractor {
    fn name(&self) -> &str {
        "carrd"
    }

    fn handles(&self, url: &str) -> bool {
        Url::parse(url.trim())
            .map(|parsed| self.classifier.site_for(&parsed).is_some())
            .unwrap_or(false)
    }

    async fn extract(&self, url: &str, referer: Option<&str>) -> Result<ExtractionResult> {
        let source = self.classifier.classify(url);
        debug!(url = %source.canonical_form, kind = ?source.kind, "classified");

        match source.kind {
            UrlKind::Page | UrlKind::Profile => self.extract_page(&source, referer).await,
            UrlKind::Image => self.extract_image(&source, referer).await,
            UrlKind::Unclassified => self.pass_through(&source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetcher::StaticFetcher;

    const PAGE: &str = r#"
        <html><head><title>Lytell</title></head><body>
            <section id="home-section"><h2>welcome</h2><img src="assets/images/image01.jpg?v=1" /></section>
            <section id="portfolio-section">
                <h1>portfolio</h1>
                <div class="gallery"><ul>
                    <li><a href="assets/images/gallery01/a.jpg?v=1" class="thumbnail"><img src="data:image/svg+xml;charset=utf8,%3Csvg%3E" data-src="assets/images/gallery01/a.jpg?v=1" /></a></li>
                    <li><a href="assets/images/gallery01/b.jpg?v=1" class="thumbnail"><img src="data:image/svg+xml;charset=utf8,%3Csvg%3E" data-src="assets/images/gallery01/b.jpg?v=1" /></a></li>
                </ul></div>
            </section>
        </body></html>
    "#;

    fn extractor(fetcher: StaticFetcher) -> (Arc<StaticFetcher>, CarrdExtractor) {
        let fetcher = Arc::new(fetcher);
        let extractor = CarrdExtractor::new(fetcher.clone(), None);
        (fetcher, extractor)
    }

    #[tokio::test]
    async fn test_page_scoped_to_fragment() {
        let (_, extractor) = extractor(
            StaticFetcher::new()
                .with_page("https://lytell.carrd.co/", PAGE)
                .with_asset("https://lytell.carrd.co/assets/images/gallery01/b_original.jpg"),
        );
        let result = extractor
            .extract("https://lytell.carrd.co/#portfolio", None)
            .await
            .unwrap();

        assert_eq!(result.page_url.as_deref(), Some("https://lytell.carrd.co/#portfolio"));
        assert_eq!(result.profile_url.as_deref(), Some("https://lytell.carrd.co"));
        assert_eq!(result.username.as_deref(), Some("lytell"));
        assert_eq!(
            result.media_urls(),
            vec![
                "https://lytell.carrd.co/assets/images/gallery01/a.jpg",
                "https://lytell.carrd.co/assets/images/gallery01/b_original.jpg",
            ]
        );
        assert_eq!(result.commentary_title, "");
        assert_eq!(
            result.commentary_body,
            "h1. portfolio\n\
             \n\
             * \"[image]\":[https://lytell.carrd.co/assets/images/gallery01/a.jpg]\n\
             * \"[image]\":[https://lytell.carrd.co/assets/images/gallery01/b_original.jpg]"
        );
    }

    #[tokio::test]
    async fn test_profile_extracts_whole_page() {
        let (fetcher, extractor) = extractor(StaticFetcher::new().with_page("https://lytell.carrd.co/", PAGE));
        let result = extractor.extract("https://lytell.carrd.co#", None).await.unwrap();
        assert_eq!(result.page_url.as_deref(), Some("https://lytell.carrd.co"));
        assert_eq!(result.media.len(), 3);
        assert_eq!(fetcher.requests()[0].0, "https://lytell.carrd.co/");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_surfaced() {
        let (_, extractor) = extractor(StaticFetcher::new());
        let err = extractor
            .extract("https://nobody.carrd.co/#home", None)
            .await
            .unwrap_err();
        match err {
            CarrdError::FetchFailure { url, source } => {
                assert_eq!(url, "https://nobody.carrd.co/#home");
                assert!(matches!(source, FetchError::Status { status: 404, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_image_with_referer_uses_page_context() {
        let (fetcher, extractor) = extractor(
            StaticFetcher::new()
                .with_page("https://lytell.carrd.co/", PAGE)
                .with_asset("https://lytell.carrd.co/assets/images/gallery01/b_original.jpg"),
        );
        let result = extractor
            .extract(
                "https://lytell.carrd.co/assets/images/gallery01/b.jpg?v=1",
                Some("https://lytell.carrd.co/#portfolio"),
            )
            .await
            .unwrap();

        assert_eq!(result.page_url.as_deref(), Some("https://lytell.carrd.co/#portfolio"));
        assert_eq!(
            result.media_urls(),
            vec!["https://lytell.carrd.co/assets/images/gallery01/b_original.jpg"]
        );
        assert!(result.commentary_body.starts_with("h1. portfolio"));
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_image_survives_unreachable_referer() {
        let (fetcher, extractor) = extractor(
            StaticFetcher::new()
                .with_asset("https://lytell.carrd.co/assets/images/gallery01/b_original.jpg"),
        );
        let result = extractor
            .extract(
                "https://lytell.carrd.co/assets/images/gallery01/b.jpg?v=1",
                Some("https://lytell.carrd.co/#portfolio"),
            )
            .await
            .unwrap();

        assert_eq!(result.page_url, None);
        assert_eq!(result.profile_url.as_deref(), Some("https://lytell.carrd.co"));
        assert_eq!(result.username.as_deref(), Some("lytell"));
        assert_eq!(
            result.media_urls(),
            vec!["https://lytell.carrd.co/assets/images/gallery01/b_original.jpg"]
        );
        assert_eq!(result.commentary_body, "");
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_image_with_foreign_referer_is_bare() {
        let (fetcher, extractor) = extractor(StaticFetcher::new());
        let result = extractor
            .extract(
                "https://popuru.crd.co/assets/images/gallery01/0a55b9f2_original.jpg?v=ea05d439",
                Some("https://twitter.com/popuru"),
            )
            .await
            .unwrap();

        assert_eq!(result.page_url, None);
        assert_eq!(result.profile_url.as_deref(), Some("https://popuru.crd.co"));
        assert_eq!(result.username.as_deref(), Some("popuru"));
        assert_eq!(
            result.media_urls(),
            vec!["https://popuru.crd.co/assets/images/gallery01/0a55b9f2_original.jpg"]
        );
        assert!(fetcher.requests().is_empty());
        assert!(fetcher.probes().is_empty());
    }

    #[tokio::test]
    async fn test_custom_domain_asset_is_verbatim() {
        let fetcher = Arc::new(StaticFetcher::new());
        let options = ExtractorOptions::builder()
            .custom_domains(vec!["hyphensam.com".to_string()])
            .build();
        let extractor = CarrdExtractor::new(fetcher.clone(), Some(options));

        let result = extractor
            .extract("https://hyphensam.com/assets/images/image04.jpg?v=2cc95429", None)
            .await
            .unwrap();
        assert_eq!(
            result.media_urls(),
            vec!["https://hyphensam.com/assets/images/image04.jpg?v=2cc95429"]
        );
        assert_eq!(result.profile_url, None);
        assert_eq!(result.username, None);
        assert!(result.other_names.is_empty());
        assert!(fetcher.probes().is_empty());
    }

    #[tokio::test]
    async fn test_unclassified_passes_through() {
        let (_, extractor) = extractor(StaticFetcher::new());
        let result = extractor
            .extract("https://example.com/pics/cat.png?size=large", None)
            .await
            .unwrap();
        assert_eq!(result.media_urls(), vec!["https://example.com/pics/cat.png?size=large"]);
        assert_eq!(result.page_url, None);

        assert!(matches!(
            extractor.extract("not a url", None).await,
            Err(CarrdError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_handles() {
        let options = ExtractorOptions::builder()
            .custom_domains(vec!["hyphensam.com".to_string()])
            .build();
        let extractor = CarrdExtractor::new(Arc::new(StaticFetcher::new()), Some(options));
        assert!(extractor.handles("https://rosymiz.carrd.co/#home"));
        assert!(extractor.handles("https://hyphensam.com/"));
        assert!(!extractor.handles("https://example.com/"));
        assert!(!extractor.handles("garbage"));
        assert_eq!(extractor.name(), "carrd");
    }
}
