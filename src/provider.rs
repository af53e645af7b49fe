//! Provider abstraction for fetching listings and quotes from external APIs

use crate::{
    error::ProviderError,
    query::UpstreamQuery,
    types::{ListingsPage, RawListing},
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Trait for upstream market-data providers
///
/// Implementations expose one paginated listings call and one batched
/// quotes call. Neither caches or retries.
#[async_trait]
pub trait ListingsProvider: Send + Sync {
    /// Fetches one page of listings
    ///
    /// # Arguments
    /// * `query` - Offset, page size and provider sort field/direction
    ///
    /// # Returns
    /// The page plus the provider's total listing count
    async fn fetch_listings(&self, query: &UpstreamQuery) -> Result<ListingsPage, ProviderError>;

    /// Fetches current quotes for several symbols in a single request
    ///
    /// # Arguments
    /// * `symbols` - Ticker symbols, sent comma-joined
    ///
    /// # Returns
    /// HashMap of upper-cased symbol to listing record. Symbols the provider
    /// does not know are simply absent.
    async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, RawListing>, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
