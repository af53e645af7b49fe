//! Constants for the listings aggregation layer
//!
//! Compile-time defaults. Anything deployment specific (API key, base URL,
//! bind address) can be overridden through `AppConfig`.

/// CoinMarketCap API base URL
pub const COINMARKETCAP_API_URL: &str = "https://pro-api.coinmarketcap.com";

/// Listings endpoint (paginated, sortable)
pub const COINMARKETCAP_LISTINGS_ENDPOINT: &str = "/v1/cryptocurrency/listings/latest";

/// Quotes endpoint (comma-joined symbol lookup)
pub const COINMARKETCAP_QUOTES_ENDPOINT: &str = "/v1/cryptocurrency/quotes/latest";

/// Header carrying the API key
pub const COINMARKETCAP_API_KEY_HEADER: &str = "x-cmc_pro_api_key";

/// Logo URL template; `{id}` is replaced with the upstream numeric id
pub const LOGO_URL_TEMPLATE: &str = "https://s2.coinmarketcap.com/static/img/coins/64x64/{id}.png";

/// HTTP request timeout when calling the upstream provider (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "market-listings-sdk/0.1.0";

/// Currency the quote block is requested in
pub const DEFAULT_CONVERT: &str = "USD";

/// Default page size for the master query
pub const DEFAULT_LIMIT: u32 = 10;

/// Smallest page size accepted
pub const MIN_LIMIT: u32 = 1;

/// Largest page size accepted (provider and application bound)
pub const MAX_LIMIT: u32 = 100;

/// Default bind host for the HTTP server
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port for the HTTP server
pub const DEFAULT_PORT: u16 = 3000;

/// Samples kept per upstream endpoint for latency percentiles
pub const METRICS_WINDOW: usize = 100;
