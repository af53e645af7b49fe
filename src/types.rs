//! Types for the listings aggregation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Percent-change time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    TwentyFourHours,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl Window {
    /// Get the window label as used in query strings and JSON keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Window::FiveMinutes => "5m",
            Window::OneHour => "1h",
            Window::SixHours => "6h",
            Window::TwentyFourHours => "24h",
            Window::SevenDays => "7d",
            Window::ThirtyDays => "30d",
        }
    }

    /// Parse a window label
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|w| w.as_str() == s)
    }

    /// Get all windows
    pub fn all() -> &'static [Window] {
        &[
            Window::FiveMinutes,
            Window::OneHour,
            Window::SixHours,
            Window::TwentyFourHours,
            Window::SevenDays,
            Window::ThirtyDays,
        ]
    }

    /// True if the upstream provider can sort on this window directly
    ///
    /// 30d is reported in the quote block but is not a listings sort value.
    pub fn is_native(&self) -> bool {
        !matches!(
            self,
            Window::FiveMinutes | Window::SixHours | Window::ThirtyDays
        )
    }

    /// The window the upstream provider is asked to sort on in place of this one
    ///
    /// 5m and 6h are not reported upstream and sort on 24h; 30d sorts on 7d.
    /// The exact ordering is restored locally.
    pub fn upstream_proxy(&self) -> Window {
        match self {
            Window::FiveMinutes | Window::SixHours => Window::TwentyFourHours,
            Window::ThirtyDays => Window::SevenDays,
            _ => *self,
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values keyed by percent-change window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowValues<T> {
    #[serde(rename = "5m")]
    pub m5: T,
    #[serde(rename = "1h")]
    pub h1: T,
    #[serde(rename = "6h")]
    pub h6: T,
    #[serde(rename = "24h")]
    pub h24: T,
    #[serde(rename = "7d")]
    pub d7: T,
    #[serde(rename = "30d")]
    pub d30: T,
}

impl<T: Copy> WindowValues<T> {
    /// Get the value for one window
    pub fn get(&self, window: Window) -> T {
        match window {
            Window::FiveMinutes => self.m5,
            Window::OneHour => self.h1,
            Window::SixHours => self.h6,
            Window::TwentyFourHours => self.h24,
            Window::SevenDays => self.d7,
            Window::ThirtyDays => self.d30,
        }
    }

    /// Apply `f` to every window
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> WindowValues<U> {
        WindowValues {
            m5: f(self.m5),
            h1: f(self.h1),
            h6: f(self.h6),
            h24: f(self.h24),
            d7: f(self.d7),
            d30: f(self.d30),
        }
    }
}

/// Quote block for one convert currency, as reported upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub volume_24h: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub percent_change_1h: Option<f64>,
    #[serde(default)]
    pub percent_change_24h: Option<f64>,
    #[serde(default)]
    pub percent_change_7d: Option<f64>,
    #[serde(default)]
    pub percent_change_30d: Option<f64>,
}

/// Upstream listing record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
    /// Quote blocks keyed by convert currency
    #[serde(default)]
    pub quote: HashMap<String, Quote>,
}

impl RawListing {
    /// Quote block for `currency`, or an empty block if the provider omitted it
    pub fn quote_in(&self, currency: &str) -> Quote {
        self.quote.get(currency).cloned().unwrap_or_default()
    }
}

/// One page of upstream listings
#[derive(Debug, Clone, Default)]
pub struct ListingsPage {
    /// Total number of listings the provider reports across all pages
    pub total_count: u64,
    pub listings: Vec<RawListing>,
}

/// Short-window percent-change figures for one symbol
///
/// `m5` and `h6` are derived: `5m = 1h / 12`, `6h = 24h / 4`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeEstimate {
    pub m5: f64,
    pub h1: f64,
    pub h6: f64,
    pub h24: f64,
}

impl ChangeEstimate {
    /// Derive the estimate from observed 1h and 24h changes
    pub fn from_observed(h1: f64, h24: f64) -> Self {
        Self {
            m5: h1 / 12.0,
            h1,
            h6: h24 / 4.0,
            h24,
        }
    }
}

/// Canonical output record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    pub logo: String,
    pub price: f64,
    pub price_formatted: String,
    pub market_cap: f64,
    pub market_cap_formatted: String,
    pub volume_24h: f64,
    pub volume_24h_formatted: String,
    pub circulating_supply: f64,
    pub circulating_supply_formatted: String,
    pub total_supply: f64,
    pub max_supply: Option<f64>,
    /// Rounded percent changes, display only
    pub percent_change: WindowValues<i64>,
    /// Raw percent changes, used for sorting and filtering
    pub raw_percent_change: WindowValues<f64>,
    /// 1-based position in the full filtered result
    pub index: u64,
}

impl CanonicalRecord {
    /// Numeric value of the field `key` orders by
    pub fn sort_value(&self, key: SortKey) -> f64 {
        match key {
            SortKey::MarketCap => self.market_cap,
            SortKey::Price => self.price,
            SortKey::Volume24h => self.volume_24h,
            SortKey::PercentChange(window) => self.raw_percent_change.get(window),
        }
    }
}

/// Named filter category or literal window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Trending,
    Gainers,
    Window(Window),
}

impl Filter {
    /// Values accepted in the `filter` query parameter
    pub const ALLOWED: &'static [&'static str] =
        &["trending", "gainers", "5m", "1h", "6h", "24h", "7d", "30d"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trending" => Some(Filter::Trending),
            "gainers" => Some(Filter::Gainers),
            other => Window::parse(other).map(Filter::Window),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::Trending => "trending",
            Filter::Gainers => "gainers",
            Filter::Window(w) => w.as_str(),
        }
    }
}

/// Field requested in `sortBy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    MarketCap,
    Price,
    Volume24h,
    PercentChange,
}

impl SortBy {
    pub const ALLOWED: &'static [&'static str] =
        &["market_cap", "price", "volume_24h", "percent_change"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "market_cap" => Some(SortBy::MarketCap),
            "price" => Some(SortBy::Price),
            "volume_24h" => Some(SortBy::Volume24h),
            "percent_change" => Some(SortBy::PercentChange),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::MarketCap => "market_cap",
            SortBy::Price => "price",
            SortBy::Volume24h => "volume_24h",
            SortBy::PercentChange => "percent_change",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const ALLOWED: &'static [&'static str] = &["asc", "desc"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Field a result set is actually ordered by, after filter/sort precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    MarketCap,
    Price,
    Volume24h,
    PercentChange(Window),
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub page_size: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PaginationMeta {
    /// Builds metadata for `total_items` spread over pages of `page_size`
    pub fn new(total_items: u64, current_page: u32, page_size: u32) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            total_items.div_ceil(page_size.max(1) as u64)
        };

        Self {
            total_items,
            total_pages,
            current_page,
            page_size,
            has_next_page: (current_page as u64) < total_pages,
            has_previous_page: total_items > 0 && current_page > 1,
        }
    }
}

/// Status block of the response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBlock {
    pub timestamp: DateTime<Utc>,
    pub error_code: u16,
    pub error_message: Option<String>,
}

impl StatusBlock {
    /// Status for a successful response
    pub fn ok() -> Self {
        Self {
            timestamp: Utc::now(),
            error_code: 0,
            error_message: None,
        }
    }

    /// Status for a failed response
    pub fn error(error_code: u16, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            error_code,
            error_message: Some(message.into()),
        }
    }
}

/// Output of one master query
#[derive(Debug, Clone)]
pub struct MasterResult {
    pub data: Vec<CanonicalRecord>,
    pub pagination: PaginationMeta,
}
