//! The page-fetching boundary.
//!
//! Transport concerns (retries, caching, TLS) belong to the caller. The
//! extractor only needs two capabilities: fetch a page's bytes, and check
//! whether an asset exists. [`HttpFetcher`] is a thin `reqwest` adapter;
//! [`StaticFetcher`] serves canned responses for offline runs and tests.

use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, REFERER};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("carrdrs/", env!("CARGO_PKG_VERSION"));

/// Raw response body plus its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedPage {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            bytes: body.into().into_bytes(),
            content_type: Some("text/html; charset=utf-8".to_string()),
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(true)
    }
}

/// Retrieves pages and probes for assets.
///
/// Both calls may be slow or fail; implementations own their timeout and
/// cancellation behaviour.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, sending `referer` as the `Referer` header when given.
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedPage, FetchError>;

    /// Whether `url` exists on the server.
    async fn exists(&self, url: &str) -> Result<bool, FetchError>;
}

/// `reqwest`-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (proxies, custom timeouts, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        FetchError::Timeout(url)
    } else {
        FetchError::Network(err.to_string())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedPage, FetchError> {
        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(FetchedPage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn exists(&self, url: &str) -> Result<bool, FetchError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Ok(response.status().is_success())
    }
}

/// In-memory fetcher serving registered pages and assets.
///
/// URLs are matched without their fragment. Every request and probe is
/// recorded so callers can inspect what the extractor asked for.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, FetchedPage>,
    assets: HashSet<String>,
    broken: HashSet<String>,
    probe_delays: HashMap<String, Duration>,
    requests: Mutex<Vec<(String, Option<String>)>>,
    probes: Mutex<Vec<String>>,
}

fn lookup_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => url.to_string(),
    }
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(lookup_key(url), FetchedPage::html(html));
        self
    }

    /// Register an asset that `exists` reports as present.
    pub fn with_asset(mut self, url: &str) -> Self {
        self.assets.insert(lookup_key(url));
        self
    }

    /// Make probes for `url` fail with a network error.
    pub fn with_broken_probe(mut self, url: &str) -> Self {
        self.broken.insert(lookup_key(url));
        self
    }

    /// Delay the answer to probes for `url`.
    pub fn with_probe_delay(mut self, url: &str, delay: Duration) -> Self {
        self.probe_delays.insert(lookup_key(url), delay);
        self
    }

    /// Page requests made so far, with the referer sent.
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Probed URLs, in the order the probes started.
    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedPage, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((url.to_string(), referer.map(str::to_string)));
        }
        self.pages
            .get(&lookup_key(url))
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn exists(&self, url: &str) -> Result<bool, FetchError> {
        let key = lookup_key(url);
        if let Ok(mut probes) = self.probes.lock() {
            probes.push(key.clone());
        }
        if let Some(delay) = self.probe_delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if self.broken.contains(&key) {
            return Err(FetchError::Network(format!("connection reset probing {key}")));
        }
        Ok(self.assets.contains(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher_serves_pages_without_fragment() {
        let fetcher = StaticFetcher::new().with_page("https://lytell.carrd.co/", "<p>hi</p>");
        let page = fetcher
            .fetch("https://lytell.carrd.co/#portfolio", Some("https://lytell.carrd.co/"))
            .await
            .unwrap();
        assert_eq!(page.text(), "<p>hi</p>");
        assert!(page.is_html());
        assert_eq!(
            fetcher.requests(),
            vec![(
                "https://lytell.carrd.co/#portfolio".to_string(),
                Some("https://lytell.carrd.co/".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_static_fetcher_missing_page_is_404() {
        let fetcher = StaticFetcher::new();
        let err = fetcher.fetch("https://nobody.carrd.co/", None).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                url: "https://nobody.carrd.co/".to_string(),
                status: 404
            }
        );
    }

    #[tokio::test]
    async fn test_static_fetcher_probes() {
        let present = "https://a.carrd.co/assets/images/gallery01/x_original.jpg";
        let broken = "https://a.carrd.co/assets/images/gallery01/y_original.jpg";
        let fetcher = StaticFetcher::new()
            .with_asset(present)
            .with_broken_probe(broken);

        assert_eq!(fetcher.exists(present).await, Ok(true));
        assert!(fetcher.exists(broken).await.is_err());
        assert_eq!(
            fetcher
                .exists("https://a.carrd.co/assets/images/gallery01/z_original.jpg")
                .await,
            Ok(false)
        );
        assert_eq!(fetcher.probes().len(), 3);
    }

    #[test]
    fn test_content_type_detection() {
        let page = FetchedPage {
            bytes: vec![0xff, 0xd8],
            content_type: Some("image/jpeg".to_string()),
        };
        assert!(!page.is_html());
    }
}
