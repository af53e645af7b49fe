//! CoinMarketCap listings provider implementation

use crate::{
    config::AppConfig,
    constants::{
        COINMARKETCAP_API_KEY_HEADER, COINMARKETCAP_LISTINGS_ENDPOINT,
        COINMARKETCAP_QUOTES_ENDPOINT, REQUEST_TIMEOUT_SECS, USER_AGENT,
    },
    error::ProviderError,
    provider::ListingsProvider,
    query::UpstreamQuery,
    types::{ListingsPage, RawListing},
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Status block present on every CoinMarketCap response
#[derive(Debug, Deserialize)]
struct CmcStatus {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    total_count: Option<u64>,
}

/// CoinMarketCap response envelope
#[derive(Debug, Deserialize)]
struct CmcResponse<T> {
    status: CmcStatus,
    data: Option<T>,
}

/// CoinMarketCap listings provider
pub struct CoinMarketCapProvider {
    client: Client,
    base_url: String,
    convert: String,
}

impl CoinMarketCapProvider {
    /// Creates a new CoinMarketCap provider
    pub fn new(api_key: &str, base_url: &str, convert: &str) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| ProviderError::ApiError(format!("API key is not a valid header value: {}", e)))?;
        headers.insert(COINMARKETCAP_API_KEY_HEADER, key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            convert: convert.to_string(),
        })
    }

    /// Creates a provider from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Self::new(&config.api_key, &config.base_url, &config.convert)
    }

    /// Issues a GET and decodes the response envelope
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<CmcResponse<T>, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(url = %url, "Requesting CoinMarketCap");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::NetworkError(e)
                }
            })?;

        // Check for rate limiting
        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        // Check for other errors
        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await.map_err(ProviderError::NetworkError)?;
        parse_response(&response_text)
    }
}

/// Decodes a CoinMarketCap envelope, surfacing error status blocks
fn parse_response<T: DeserializeOwned>(text: &str) -> Result<CmcResponse<T>, ProviderError> {
    let parsed: CmcResponse<T> = serde_json::from_str(text).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse CoinMarketCap response: {}. Response: {}",
            e, text
        ))
    })?;

    if parsed.status.error_code != 0 {
        return Err(ProviderError::ApiError(format!(
            "error_code {}: {}",
            parsed.status.error_code,
            parsed.status.error_message.as_deref().unwrap_or("unknown error")
        )));
    }

    Ok(parsed)
}

fn into_listings_page(response: CmcResponse<Vec<RawListing>>) -> ListingsPage {
    let listings = response.data.unwrap_or_default();
    ListingsPage {
        total_count: response
            .status
            .total_count
            .unwrap_or(listings.len() as u64),
        listings,
    }
}

fn into_quotes(response: CmcResponse<HashMap<String, RawListing>>) -> HashMap<String, RawListing> {
    response
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(symbol, listing)| (symbol.to_uppercase(), listing))
        .collect()
}

#[async_trait]
impl ListingsProvider for CoinMarketCapProvider {
    async fn fetch_listings(&self, query: &UpstreamQuery) -> Result<ListingsPage, ProviderError> {
        let params = query.to_pairs(&self.convert);
        let response = self
            .get::<Vec<RawListing>>(COINMARKETCAP_LISTINGS_ENDPOINT, &params)
            .await?;

        let page = into_listings_page(response);
        tracing::debug!(
            count = page.listings.len(),
            total_count = page.total_count,
            "Fetched listings from CoinMarketCap"
        );

        Ok(page)
    }

    async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, RawListing>, ProviderError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let joined = symbols
            .iter()
            .map(|s| s.to_uppercase())
            .collect::<Vec<_>>()
            .join(",");
        let params = [("symbol", joined), ("convert", self.convert.clone())];

        let response = self
            .get::<HashMap<String, RawListing>>(COINMARKETCAP_QUOTES_ENDPOINT, &params)
            .await?;

        let quotes = into_quotes(response);
        tracing::debug!(count = quotes.len(), "Fetched quotes from CoinMarketCap");

        Ok(quotes)
    }

    fn provider_name(&self) -> &'static str {
        "coinmarketcap"
    }
}
