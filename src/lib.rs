//! # Market Listings SDK
//!
//! Read-only aggregation layer in front of CoinMarketCap. Fetches a page of
//! cryptocurrency listings, adds 5m/6h percent-change estimates the provider
//! does not report, and serves filtering, search, sorting and pagination
//! through a single master query.
//!
//! ## Usage
//!
//! ```no_run
//! use market_listings_sdk::{AppConfig, MasterQueryPipeline, QueryDirective};
//! use market_listings_sdk::types::Filter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let pipeline = MasterQueryPipeline::from_config(&config)?;
//!
//! let directive = QueryDirective {
//!     filter: Some(Filter::Gainers),
//!     limit: 20,
//!     ..QueryDirective::default()
//! };
//! let result = pipeline.run(&directive).await?;
//! for record in &result.data {
//!     println!("{} {} {}", record.index, record.symbol, record.price_formatted);
//! }
//! println!("{} matching listings", result.pagination.total_items);
//! # Ok(())
//! # }
//! ```
//!
//! ## Filter and sort precedence
//!
//! A `filter` fully overrides `sortBy`. `trending` and `gainers` order by the
//! `sortPeriod` window, descending; a literal window filter (`5m`, `1h`,
//! `6h`, `24h`, `7d`, `30d`) orders by that window in the requested
//! direction. Without a filter, `sortPeriod` only matters for
//! `sortBy=percent_change`.
//!
//! ## Two-tier narrowing
//!
//! The provider cannot sort on 5m/6h/30d and cannot restrict to positive
//! changes. The upstream call sorts on the closest window it supports (24h
//! for 5m and 6h, 7d for 30d); the positivity filter, search and exact
//! ordering are applied locally, and pagination totals are recomputed
//! whenever local filtering ran.

pub mod api;
pub mod config;
pub mod constants;
pub mod directive;
pub mod error;
pub mod estimator;
pub mod format;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod providers;
pub mod query;
pub mod transform;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use directive::{MasterParams, QueryDirective};
pub use error::{ConfigError, ProviderError, QueryError};
pub use pipeline::MasterQueryPipeline;
pub use types::{CanonicalRecord, MasterResult, PaginationMeta};
