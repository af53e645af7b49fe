//! Master query pipeline
//!
//! Executes one master query end to end:
//!
//! ```text
//! QueryDirective
//!     ↓
//! UpstreamQuery::build   (validation, remote sort field/direction)
//!     ↓
//! ListingsProvider::fetch_listings   (one page, sized to limit)
//!     ↓
//! ChangeEstimator::estimate   (one batched quotes call, never fails)
//!     ↓
//! transform   (canonical records)
//!     ↓
//! gainers filter → search filter → local sort → re-index
//!     ↓
//! PaginationMeta
//! ```
//!
//! Every stage after the fetch only narrows or reorders; nothing re-fetches.

use crate::{
    config::AppConfig,
    directive::QueryDirective,
    error::{ProviderError, QueryError},
    estimator::ChangeEstimator,
    metrics::{EndpointMetrics, UpstreamEndpoint, UpstreamMetrics},
    provider::ListingsProvider,
    providers::CoinMarketCapProvider,
    query::UpstreamQuery,
    transform::transform,
    types::{CanonicalRecord, Filter, MasterResult, PaginationMeta, SortDirection},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Runs master queries and symbol lookups against one provider
///
/// Holds no per-request state, so one instance serves concurrent requests.
pub struct MasterQueryPipeline {
    provider: Arc<dyn ListingsProvider>,
    estimator: ChangeEstimator,
    metrics: Arc<UpstreamMetrics>,
    convert: String,
}

impl MasterQueryPipeline {
    /// Creates a pipeline over a custom provider
    pub fn new(provider: Arc<dyn ListingsProvider>, convert: impl Into<String>) -> Self {
        let convert = convert.into();
        let metrics = Arc::new(UpstreamMetrics::new());
        let estimator = ChangeEstimator::new(provider.clone(), metrics.clone(), convert.clone());

        Self {
            provider,
            estimator,
            metrics,
            convert,
        }
    }

    /// Creates a pipeline backed by CoinMarketCap
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let provider = CoinMarketCapProvider::from_config(config)?;
        Ok(Self::new(Arc::new(provider), config.convert.clone()))
    }

    /// Returns the name of the upstream provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Per-endpoint upstream call metrics
    pub async fn upstream_metrics(&self) -> Vec<EndpointMetrics> {
        self.metrics.snapshot().await
    }

    /// Executes one master query
    ///
    /// # Returns
    /// A page of at most `limit` records with pagination metadata, or a
    /// validation error (before any network call) or external API error.
    pub async fn run(&self, directive: &QueryDirective) -> Result<MasterResult, QueryError> {
        let span = tracing::info_span!(
            "master_query",
            request_id = %Uuid::new_v4(),
            page = directive.page,
            limit = directive.limit,
            filter = directive.filter.map(|f| f.as_str()).unwrap_or("none"),
        );

        self.run_inner(directive).instrument(span).await
    }

    async fn run_inner(&self, directive: &QueryDirective) -> Result<MasterResult, QueryError> {
        let query = UpstreamQuery::build(directive)?;

        let start = Instant::now();
        let page = match self.provider.fetch_listings(&query).await {
            Ok(page) => {
                self.metrics
                    .record(UpstreamEndpoint::Listings, start.elapsed(), true)
                    .await;
                page
            }
            Err(e) => {
                self.metrics
                    .record(UpstreamEndpoint::Listings, start.elapsed(), false)
                    .await;
                tracing::error!(
                    error = %e,
                    provider = self.provider.provider_name(),
                    "Listings fetch failed"
                );
                return Err(QueryError::ExternalApi(e));
            }
        };

        let symbols: Vec<String> = page.listings.iter().map(|l| l.symbol.clone()).collect();
        let estimates = self.estimator.estimate(&symbols).await;
        let records = transform(&page.listings, &estimates, query.start, &self.convert);

        let result = post_process(records, directive, &query, page.total_count);
        tracing::info!(
            upstream_count = page.listings.len(),
            returned = result.data.len(),
            total_items = result.pagination.total_items,
            latency_ms = start.elapsed().as_millis() as u64,
            "Master query complete"
        );

        Ok(result)
    }

    /// Looks up a single symbol through the quotes endpoint
    ///
    /// Short-window figures are derived from the record's own quote.
    pub async fn lookup(&self, symbol: &str) -> Result<CanonicalRecord, QueryError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(QueryError::validation("symbol", "must not be empty"));
        }

        let start = Instant::now();
        let quotes = self
            .provider
            .fetch_quotes(std::slice::from_ref(&symbol))
            .await;
        self.metrics
            .record(UpstreamEndpoint::Quotes, start.elapsed(), quotes.is_ok())
            .await;

        let quotes = quotes.map_err(|e| {
            tracing::error!(error = %e, symbol = %symbol, "Symbol lookup failed");
            QueryError::ExternalApi(e)
        })?;

        let listing = quotes
            .get(&symbol)
            .ok_or_else(|| QueryError::not_found(format!("symbol {}", symbol)))?;

        transform(std::slice::from_ref(listing), &HashMap::new(), 1, &self.convert)
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::internal("transform produced no record"))
    }
}

/// Local narrowing, ordering and pagination of one transformed page
fn post_process(
    mut records: Vec<CanonicalRecord>,
    directive: &QueryDirective,
    query: &UpstreamQuery,
    upstream_total: u64,
) -> MasterResult {
    let mut locally_filtered = false;

    if directive.filter == Some(Filter::Gainers) {
        if let Some(period) = directive.resolved_period() {
            records.retain(|r| r.raw_percent_change.get(period) > 0.0);
        }
        locally_filtered = true;
    }

    if let Some(term) = directive.search_term() {
        let needle = term.to_lowercase();
        records.retain(|r| {
            r.name.to_lowercase().contains(&needle) || r.symbol.to_lowercase().contains(&needle)
        });
        locally_filtered = true;
    }

    if query.needs_local_sort() {
        let key = query.sort_key;
        // sort_by is stable: equal keys keep upstream order
        match directive.effective_direction() {
            SortDirection::Asc => {
                records.sort_by(|a, b| a.sort_value(key).total_cmp(&b.sort_value(key)))
            }
            SortDirection::Desc => {
                records.sort_by(|a, b| b.sort_value(key).total_cmp(&a.sort_value(key)))
            }
        }
    }

    records.truncate(directive.limit as usize);
    for (position, record) in records.iter_mut().enumerate() {
        record.index = query.start + position as u64;
    }

    // Once rows were dropped locally the upstream count no longer applies.
    let total_items = if records.is_empty() || locally_filtered {
        records.len() as u64
    } else {
        upstream_total
    };

    MasterResult {
        pagination: PaginationMeta::new(total_items, directive.page, directive.limit),
        data: records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{listing, MockProvider};
    use crate::types::{RawListing, SortBy, Window};

    fn pipeline(provider: Arc<MockProvider>) -> MasterQueryPipeline {
        MasterQueryPipeline::new(provider, "USD")
    }

    /// Ten listings sorted by 24h change descending, six of them positive
    fn mixed_page() -> Vec<RawListing> {
        let changes = [9.0, 7.5, 5.0, 3.2, 1.1, 0.4, -0.2, -1.0, -3.3, -8.0];
        changes
            .iter()
            .enumerate()
            .map(|(i, h24)| {
                let id = i as u64 + 1;
                listing(id, &format!("Coin{}", id), &format!("C{}", id), 1e9 - id as f64, 0.1, *h24)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_scenario_gainers_recomputes_total() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(5000, mixed_page());

        let directive = QueryDirective {
            filter: Some(Filter::Gainers),
            sort_period: Window::TwentyFourHours,
            ..QueryDirective::default()
        };
        let result = pipeline(provider.clone()).run(&directive).await.unwrap();

        assert_eq!(result.data.len(), 6);
        assert_eq!(result.pagination.total_items, 6);
        assert_eq!(result.pagination.total_pages, 1);
        assert!(!result.pagination.has_next_page);
        assert!(result.data.iter().all(|r| r.raw_percent_change.h24 > 0.0));
        assert!(result
            .data
            .windows(2)
            .all(|w| w[0].raw_percent_change.h24 >= w[1].raw_percent_change.h24));

        let calls = provider.listings_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sort, "percent_change_24h");
        assert_eq!(calls[0].sort_dir, SortDirection::Desc);
    }

    #[tokio::test]
    async fn test_scenario_upstream_total_paging() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(23, mixed_page().into_iter().take(5).collect());

        let directive = QueryDirective {
            page: 2,
            limit: 5,
            ..QueryDirective::default()
        };
        let result = pipeline(provider.clone()).run(&directive).await.unwrap();

        assert_eq!(provider.listings_calls()[0].start, 6);
        assert_eq!(result.pagination.total_items, 23);
        assert_eq!(result.pagination.total_pages, 5);
        assert!(result.pagination.has_next_page);
        assert!(result.pagination.has_previous_page);
        assert_eq!(result.data[0].index, 6);
        assert_eq!(result.data[4].index, 10);
    }

    #[tokio::test]
    async fn test_scenario_search() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(
            2,
            vec![
                listing(1, "Bitcoin", "BTC", 8e11, 0.1, 1.0),
                listing(1027, "Ethereum", "ETH", 3e11, 0.1, 1.0),
                listing(3, "Wrapped Token", "WBIT", 1e8, 0.1, 1.0),
            ],
        );

        let directive = QueryDirective {
            search: Some(" BIT ".to_string()),
            ..QueryDirective::default()
        };
        let result = pipeline(provider).run(&directive).await.unwrap();

        let symbols: Vec<&str> = result.data.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "WBIT"]);
        assert_eq!(result.pagination.total_items, 2);
        assert_eq!(result.data[1].index, 2);
    }

    #[tokio::test]
    async fn test_scenario_enrichment_failure_falls_back() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(10, mixed_page());
        provider.set_quotes_error("HTTP 503");

        let result = pipeline(provider.clone())
            .run(&QueryDirective::default())
            .await
            .unwrap();

        assert_eq!(result.data.len(), 10);
        assert_eq!(provider.quote_calls().len(), 1);
        for record in &result.data {
            let raw = record.raw_percent_change;
            assert!((raw.m5 - raw.h1 / 12.0).abs() < 1e-12);
            assert!((raw.h6 - raw.h24 / 4.0).abs() < 1e-12);
        }
    }

    #[tokio::test]
    async fn test_enrichment_replaces_short_windows() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(1, vec![listing(1, "Bitcoin", "BTC", 8e11, 0.1, 1.0)]);
        provider.set_quotes(vec![listing(1, "Bitcoin", "BTC", 8e11, 6.0, 20.0)]);

        let result = pipeline(provider).run(&QueryDirective::default()).await.unwrap();
        let raw = result.data[0].raw_percent_change;
        assert_eq!(raw.m5, 0.5);
        assert_eq!(raw.h6, 5.0);
    }

    #[tokio::test]
    async fn test_short_window_filter_sorts_locally() {
        let provider = Arc::new(MockProvider::new());
        // Upstream order is by the 24h proxy; the 5m ordering differs.
        provider.set_page(
            3,
            vec![
                listing(1, "Alpha", "AAA", 3e9, 1.2, 9.0),
                listing(2, "Beta", "BBB", 2e9, 6.0, 5.0),
                listing(3, "Gamma", "CCC", 1e9, -2.4, 1.0),
            ],
        );

        let directive = QueryDirective {
            filter: Some(Filter::Window(Window::FiveMinutes)),
            ..QueryDirective::default()
        };
        let result = pipeline(provider.clone()).run(&directive).await.unwrap();

        let symbols: Vec<&str> = result.data.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BBB", "AAA", "CCC"]);
        assert_eq!(provider.listings_calls()[0].sort, "percent_change_24h");
        // No local narrowing: total comes from upstream
        assert_eq!(result.pagination.total_items, 3);

        let asc = QueryDirective {
            sort_direction: SortDirection::Asc,
            ..directive
        };
        let result = pipeline(provider).run(&asc).await.unwrap();
        let symbols: Vec<&str> = result.data.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["CCC", "AAA", "BBB"]);
    }

    #[tokio::test]
    async fn test_ascending_sort_is_stable() {
        let provider = Arc::new(MockProvider::new());
        let mut a = listing(1, "First", "FST", 1e9, 0.0, 0.0);
        let mut b = listing(2, "Second", "SND", 1e9, 0.0, 0.0);
        let c = listing(3, "Cheap", "CHP", 1e6, 0.0, 0.0);
        a.quote.get_mut("USD").unwrap().price = Some(10.0);
        b.quote.get_mut("USD").unwrap().price = Some(10.0);
        provider.set_page(3, vec![a, b, c]);

        let directive = QueryDirective {
            sort_by: SortBy::Price,
            sort_direction: SortDirection::Asc,
            ..QueryDirective::default()
        };
        let result = pipeline(provider).run(&directive).await.unwrap();
        let symbols: Vec<&str> = result.data.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["CHP", "FST", "SND"]);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(40, mixed_page());
        let pipeline = pipeline(provider);

        let directive = QueryDirective {
            page: 2,
            filter: Some(Filter::Window(Window::SixHours)),
            ..QueryDirective::default()
        };
        let first = pipeline.run(&directive).await.unwrap();
        let second = pipeline.run(&directive).await.unwrap();

        assert_eq!(first.data, second.data);
        assert_eq!(first.pagination, second.pagination);
    }

    #[tokio::test]
    async fn test_gainers_with_none_positive_is_empty_page() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(
            200,
            vec![
                listing(1, "Down", "DWN", 1e9, -1.0, -1.0),
                listing(2, "Flat", "FLT", 1e9, 0.0, 0.0),
            ],
        );

        let directive = QueryDirective {
            filter: Some(Filter::Gainers),
            ..QueryDirective::default()
        };
        let result = pipeline(provider).run(&directive).await.unwrap();

        assert!(result.data.is_empty());
        assert_eq!(result.pagination.total_items, 0);
        assert_eq!(result.pagination.total_pages, 0);
        assert!(!result.pagination.has_next_page);
        assert!(!result.pagination.has_previous_page);
    }

    #[tokio::test]
    async fn test_empty_upstream_page() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(23, Vec::new());

        let directive = QueryDirective {
            page: 9,
            ..QueryDirective::default()
        };
        let result = pipeline(provider.clone()).run(&directive).await.unwrap();

        assert!(result.data.is_empty());
        assert_eq!(result.pagination.total_items, 0);
        assert!(!result.pagination.has_previous_page);
        assert!(provider.quote_calls().is_empty());
    }

    #[tokio::test]
    async fn test_gainers_on_later_page_counts_filtered_rows() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(5000, mixed_page());

        let directive = QueryDirective {
            page: 3,
            filter: Some(Filter::Gainers),
            ..QueryDirective::default()
        };
        let result = pipeline(provider).run(&directive).await.unwrap();

        assert_eq!(result.data.len(), 6);
        assert_eq!(result.pagination.total_items, 6);
        assert_eq!(result.pagination.total_pages, 1);
        assert_eq!(result.pagination.current_page, 3);
        assert!(!result.pagination.has_next_page);
        assert!(result.pagination.has_previous_page);
        assert_eq!(result.data[0].index, 21);
    }

    #[tokio::test]
    async fn test_search_on_later_page_counts_filtered_rows() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(5000, mixed_page());

        let directive = QueryDirective {
            page: 3,
            search: Some("Coin1".to_string()),
            ..QueryDirective::default()
        };
        let result = pipeline(provider).run(&directive).await.unwrap();

        // Coin1 and Coin10
        let symbols: Vec<&str> = result.data.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["C1", "C10"]);
        assert_eq!(result.pagination.total_items, 2);
        assert_eq!(result.pagination.total_pages, 1);
        assert!(!result.pagination.has_next_page);
        assert!(result.pagination.has_previous_page);
    }

    #[tokio::test]
    async fn test_listings_failure_is_external_error() {
        let provider = Arc::new(MockProvider::new());
        provider.set_listings_error("HTTP 401: invalid key");
        let pipeline = pipeline(provider.clone());

        let err = pipeline.run(&QueryDirective::default()).await.unwrap_err();
        assert!(matches!(err, QueryError::ExternalApi(_)));
        assert_eq!(err.error_code(), 500);
        assert!(provider.quote_calls().is_empty());

        let metrics = pipeline.upstream_metrics().await;
        assert_eq!(metrics[0].endpoint, "listings");
        assert_eq!(metrics[0].failed_requests, 1);
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let provider = Arc::new(MockProvider::new());
        let directive = QueryDirective {
            limit: 0,
            ..QueryDirective::default()
        };

        let err = pipeline(provider.clone()).run(&directive).await.unwrap_err();
        assert_eq!(err.error_code(), 400);
        assert!(provider.listings_calls().is_empty());
    }

    #[tokio::test]
    async fn test_page_never_exceeds_limit() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(100, mixed_page());

        let directive = QueryDirective {
            limit: 4,
            ..QueryDirective::default()
        };
        let result = pipeline(provider).run(&directive).await.unwrap();
        assert_eq!(result.data.len(), 4);
        assert_eq!(result.pagination.total_pages, 25);
    }

    #[tokio::test]
    async fn test_lookup() {
        let provider = Arc::new(MockProvider::new());
        provider.set_quotes(vec![listing(1, "Bitcoin", "BTC", 8e11, 1.2, 8.0)]);
        let pipeline = pipeline(provider.clone());

        let record = pipeline.lookup(" btc ").await.unwrap();
        assert_eq!(record.name, "Bitcoin");
        assert_eq!(record.index, 1);
        assert!((record.raw_percent_change.m5 - 0.1).abs() < 1e-12);
        assert_eq!(provider.quote_calls(), vec![vec!["BTC".to_string()]]);

        let err = pipeline.lookup("NOPE").await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
        assert_eq!(err.error_code(), 404);

        let err = pipeline.lookup("  ").await.unwrap_err();
        assert_eq!(err.error_code(), 400);
    }
}
