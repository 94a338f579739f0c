//! Routing of input URLs to the strategy responsible for their host.

use crate::error::{CarrdError, Result};
use crate::extractor::ExtractionStrategy;
use crate::result::ExtractionResult;
use tracing::debug;

/// Strategies in registration order. The first one that handles a URL wins.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: Box<dyn ExtractionStrategy>) -> &mut Self {
        self.strategies.push(strategy);
        self
    }

    pub fn find(&self, url: &str) -> Option<&dyn ExtractionStrategy> {
        self.strategies
            .iter()
            .find(|strategy| strategy.handles(url))
            .map(|strategy| strategy.as_ref())
    }

    pub async fn extract(&self, url: &str, referer: Option<&str>) -> Result<ExtractionResult> {
        let strategy = self
            .find(url)
            .ok_or_else(|| CarrdError::Other(format!("no strategy handles {url}")))?;
        debug!(url, strategy = strategy.name(), "dispatching");
        strategy.extract(url, referer).await
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::CarrdExtractor;
    use crate::fetcher::StaticFetcher;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Fallback;

    #[async_trait]
    impl ExtractionStrategy for Fallback {
        fn name(&self) -> &str {
            "fallback"
        }

        fn handles(&self, _url: &str) -> bool {
            true
        }

        async fn extract(&self, _url: &str, _referer: Option<&str>) -> Result<ExtractionResult> {
            Ok(ExtractionResult::default())
        }
    }

    fn registry() -> StrategyRegistry {
        let fetcher = Arc::new(
            StaticFetcher::new().with_page("https://rosymiz.carrd.co/", "<p>@GenshinTarot</p>"),
        );
        let mut registry = StrategyRegistry::new();
        registry
            .register(Box::new(CarrdExtractor::new(fetcher, None)))
            .register(Box::new(Fallback));
        registry
    }

    #[test]
    fn test_first_matching_strategy_wins() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("https://rosymiz.carrd.co/#home").map(|s| s.name()), Some("carrd"));
        assert_eq!(registry.find("https://example.com/").map(|s| s.name()), Some("fallback"));
    }

    #[tokio::test]
    async fn test_dispatch() {
        let result = registry()
            .extract("https://rosymiz.carrd.co/#home", None)
            .await
            .unwrap();
        assert_eq!(result.username.as_deref(), Some("rosymiz"));
        assert_eq!(result.commentary_body, "@GenshinTarot");
    }

    #[tokio::test]
    async fn test_no_strategy() {
        let registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.extract("https://rosymiz.carrd.co/", None).await,
            Err(CarrdError::Other(_))
        ));
    }
}
