//! Caller query directive and its validation

use crate::{
    constants::{DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT},
    error::QueryError,
    types::{Filter, SortBy, SortDirection, SortKey, Window},
};
use serde::Deserialize;

/// Periods accepted in `sortPeriod`
pub const SORT_PERIODS: &[&str] = &["1h", "24h", "7d", "30d"];

/// Raw master query parameters, exactly as they arrive on the query string
///
/// Everything is a string so that malformed values are reported by
/// [`QueryDirective::from_params`] rather than by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub filter: Option<String>,
    pub sort_by: Option<String>,
    pub sort_period: Option<String>,
    pub sort_direction: Option<String>,
    pub search: Option<String>,
}

/// Validated master query directive
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDirective {
    pub page: u32,
    pub limit: u32,
    /// When set, fully overrides `sort_by` for ordering
    pub filter: Option<Filter>,
    pub sort_by: SortBy,
    pub sort_period: Window,
    pub sort_direction: SortDirection,
    pub search: Option<String>,
}

impl Default for QueryDirective {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            filter: None,
            sort_by: SortBy::MarketCap,
            sort_period: Window::TwentyFourHours,
            sort_direction: SortDirection::Desc,
            search: None,
        }
    }
}

impl QueryDirective {
    /// Validates raw parameters, applying defaults for absent ones
    pub fn from_params(params: &MasterParams) -> Result<Self, QueryError> {
        let defaults = Self::default();

        let page = match non_empty(&params.page) {
            Some(raw) => parse_bounded("page", raw, 1, u32::MAX)?,
            None => defaults.page,
        };

        let limit = match non_empty(&params.limit) {
            Some(raw) => parse_bounded("limit", raw, MIN_LIMIT, MAX_LIMIT)?,
            None => defaults.limit,
        };

        let filter = non_empty(&params.filter)
            .map(|raw| {
                Filter::parse(raw).ok_or_else(|| QueryError::not_one_of("filter", raw, Filter::ALLOWED))
            })
            .transpose()?;

        let sort_by = non_empty(&params.sort_by)
            .map(|raw| {
                SortBy::parse(raw).ok_or_else(|| QueryError::not_one_of("sortBy", raw, SortBy::ALLOWED))
            })
            .transpose()?
            .unwrap_or(defaults.sort_by);

        let sort_period = non_empty(&params.sort_period)
            .map(|raw| {
                Window::parse(raw)
                    .filter(|w| SORT_PERIODS.contains(&w.as_str()))
                    .ok_or_else(|| QueryError::not_one_of("sortPeriod", raw, SORT_PERIODS))
            })
            .transpose()?
            .unwrap_or(defaults.sort_period);

        let sort_direction = non_empty(&params.sort_direction)
            .map(|raw| {
                SortDirection::parse(raw)
                    .ok_or_else(|| QueryError::not_one_of("sortDirection", raw, SortDirection::ALLOWED))
            })
            .transpose()?
            .unwrap_or(defaults.sort_direction);

        let search = non_empty(&params.search).map(str::to_string);

        Ok(Self {
            page,
            limit,
            filter,
            sort_by,
            sort_period,
            sort_direction,
            search,
        })
    }

    /// Window used for percent-change ordering and filtering, if any
    ///
    /// A window filter names it directly; trending and gainers use
    /// `sort_period`; without a filter it only applies to
    /// `sort_by = percent_change`.
    pub fn resolved_period(&self) -> Option<Window> {
        match self.filter {
            Some(Filter::Window(window)) => Some(window),
            Some(Filter::Trending) | Some(Filter::Gainers) => Some(self.sort_period),
            None if self.sort_by == SortBy::PercentChange => Some(self.sort_period),
            None => None,
        }
    }

    /// Field the result is ordered by
    pub fn sort_key(&self) -> SortKey {
        if let Some(window) = self.resolved_period() {
            return SortKey::PercentChange(window);
        }
        match self.sort_by {
            SortBy::MarketCap => SortKey::MarketCap,
            SortBy::Price => SortKey::Price,
            SortBy::Volume24h => SortKey::Volume24h,
            SortBy::PercentChange => SortKey::PercentChange(self.sort_period),
        }
    }

    /// Direction the result is ordered in; trending and gainers force descending
    pub fn effective_direction(&self) -> SortDirection {
        match self.filter {
            Some(Filter::Trending) | Some(Filter::Gainers) => SortDirection::Desc,
            _ => self.sort_direction,
        }
    }

    /// Trimmed search term, if one was given
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 1-based offset of the first record on the requested page
    pub fn start(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64 + 1
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bounded(param: &str, raw: &str, min: u32, max: u32) -> Result<u32, QueryError> {
    let range = if max == u32::MAX {
        format!("an integer >= {}", min)
    } else {
        format!("an integer between {} and {}", min, max)
    };

    raw.parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| QueryError::validation(param, format!("'{}' must be {}", raw, range)))
}
