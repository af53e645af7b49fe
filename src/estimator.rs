//! Short-window percent-change estimator
//!
//! The provider reports 1h and 24h changes but not 5m or 6h. Both are
//! approximated from a single quotes snapshot assuming a constant rate of
//! change inside the window: `5m = 1h / 12` and `6h = 24h / 4`. Values near a
//! sign change can be far off; there is no confidence interval.

use crate::{
    metrics::{UpstreamEndpoint, UpstreamMetrics},
    provider::ListingsProvider,
    types::{ChangeEstimate, RawListing},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Produces [`ChangeEstimate`]s with one batched quotes call
pub struct ChangeEstimator {
    provider: Arc<dyn ListingsProvider>,
    metrics: Arc<UpstreamMetrics>,
    convert: String,
}

impl ChangeEstimator {
    pub fn new(
        provider: Arc<dyn ListingsProvider>,
        metrics: Arc<UpstreamMetrics>,
        convert: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            metrics,
            convert: convert.into(),
        }
    }

    /// Estimates short-window changes for `symbols`
    ///
    /// Never fails. Any upstream error yields an empty map, and callers treat
    /// a missing symbol as "no estimate available".
    pub async fn estimate(&self, symbols: &[String]) -> HashMap<String, ChangeEstimate> {
        if symbols.is_empty() {
            return HashMap::new();
        }

        let start = Instant::now();
        match self.provider.fetch_quotes(symbols).await {
            Ok(quotes) => {
                self.metrics
                    .record(UpstreamEndpoint::Quotes, start.elapsed(), true)
                    .await;

                let estimates: HashMap<String, ChangeEstimate> = quotes
                    .iter()
                    .filter_map(|(symbol, listing)| {
                        estimate_from(listing, &self.convert).map(|e| (symbol.clone(), e))
                    })
                    .collect();

                tracing::debug!(
                    requested = symbols.len(),
                    estimated = estimates.len(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Estimated short-window changes"
                );
                estimates
            }
            Err(e) => {
                self.metrics
                    .record(UpstreamEndpoint::Quotes, start.elapsed(), false)
                    .await;
                tracing::warn!(
                    error = %e,
                    provider = self.provider.provider_name(),
                    "Quotes call failed, falling back to listing figures"
                );
                HashMap::new()
            }
        }
    }
}

/// Derives an estimate from a quote, if it carries both 1h and 24h figures
fn estimate_from(listing: &RawListing, convert: &str) -> Option<ChangeEstimate> {
    let quote = listing.quote_in(convert);
    Some(ChangeEstimate::from_observed(
        quote.percent_change_1h?,
        quote.percent_change_24h?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{listing, MockProvider};

    fn estimator(provider: Arc<MockProvider>) -> ChangeEstimator {
        ChangeEstimator::new(provider, Arc::new(UpstreamMetrics::new()), "USD")
    }

    #[tokio::test]
    async fn test_single_batched_call() {
        let provider = Arc::new(MockProvider::new());
        provider.set_quotes(vec![
            listing(1, "Bitcoin", "BTC", 8e11, 1.2, 8.0),
            listing(2, "Ethereum", "ETH", 3e11, -0.6, -4.0),
        ]);

        let symbols = vec!["BTC".to_string(), "ETH".to_string(), "XYZ".to_string()];
        let estimates = estimator(provider.clone()).estimate(&symbols).await;

        assert_eq!(provider.quote_calls(), vec![symbols]);
        assert_eq!(estimates.len(), 2);
        let btc = estimates["BTC"];
        assert!((btc.m5 - 0.1).abs() < 1e-12);
        assert!((btc.h6 - 2.0).abs() < 1e-12);
        assert!((estimates["ETH"].h6 - -1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_failure_yields_empty_map() {
        let provider = Arc::new(MockProvider::new());
        provider.set_quotes_error("HTTP 500");

        let estimates = estimator(provider)
            .estimate(&["BTC".to_string()])
            .await;
        assert!(estimates.is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let provider = Arc::new(MockProvider::new());
        let estimates = estimator(provider.clone()).estimate(&[]).await;
        assert!(estimates.is_empty());
        assert!(provider.quote_calls().is_empty());
    }

    #[test]
    fn test_quote_without_figures_is_skipped() {
        let mut l = listing(1, "Bitcoin", "BTC", 8e11, 1.0, 2.0);
        l.quote.get_mut("USD").unwrap().percent_change_24h = None;
        assert!(estimate_from(&l, "USD").is_none());
    }
}
