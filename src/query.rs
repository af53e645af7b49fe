//! Upstream query builder
//!
//! Translates a [`QueryDirective`] into the parameters the listings endpoint
//! understands. The provider can only sort on 1h, 24h and 7d changes and has
//! no "positive change only" primitive, so this is the remote, best-effort
//! half of a two-tier narrowing. Whatever it cannot express is flagged for
//! the pipeline to enforce locally.

use crate::{
    constants::{MAX_LIMIT, MIN_LIMIT},
    directive::QueryDirective,
    error::QueryError,
    types::{Filter, SortDirection, SortKey, Window},
};

/// Parameter set for one upstream listings call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamQuery {
    /// 1-based offset of the first listing
    pub start: u64,
    pub limit: u32,
    /// Provider field name (`market_cap`, `price`, `volume_24h`, `percent_change_24h`, ...)
    pub sort: String,
    pub sort_dir: SortDirection,
    /// Exact key the result must be ordered by
    pub sort_key: SortKey,
    /// True if `sort` is a stand-in for a window the provider does not report
    pub proxied: bool,
}

impl UpstreamQuery {
    /// Builds upstream parameters, rejecting page/limit out of bounds
    pub fn build(directive: &QueryDirective) -> Result<Self, QueryError> {
        if directive.page < 1 {
            return Err(QueryError::validation("page", "must be an integer >= 1"));
        }
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&directive.limit) {
            return Err(QueryError::validation(
                "limit",
                format!("must be an integer between {} and {}", MIN_LIMIT, MAX_LIMIT),
            ));
        }

        let sort_key = directive.sort_key();
        let (sort, proxied) = match sort_key {
            SortKey::MarketCap => ("market_cap".to_string(), false),
            SortKey::Price => ("price".to_string(), false),
            SortKey::Volume24h => ("volume_24h".to_string(), false),
            SortKey::PercentChange(window) => {
                let upstream = window.upstream_proxy();
                if upstream != window {
                    tracing::debug!(
                        requested = %window,
                        proxy = %upstream,
                        "Window not supported upstream, sorting on proxy"
                    );
                }
                (percent_change_field(upstream), upstream != window)
            }
        };

        // Gainers only forces the ordering; positivity is filtered locally.
        let sort_dir = match directive.filter {
            Some(Filter::Trending) | Some(Filter::Gainers) => SortDirection::Desc,
            _ => directive.sort_direction,
        };

        Ok(Self {
            start: directive.start(),
            limit: directive.limit,
            sort,
            sort_dir,
            sort_key,
            proxied,
        })
    }

    /// True if the upstream ordering cannot be trusted as final
    ///
    /// Proxied windows come back in proxy order. Ascending requests are
    /// always re-sorted locally, and so are percent-change orderings since
    /// enrichment replaces the 1h/24h figures the provider sorted on.
    pub fn needs_local_sort(&self) -> bool {
        self.proxied
            || self.sort_dir == SortDirection::Asc
            || matches!(self.sort_key, SortKey::PercentChange(_))
    }

    /// Query string pairs for the listings endpoint
    pub fn to_pairs(&self, convert: &str) -> Vec<(&'static str, String)> {
        vec![
            ("start", self.start.to_string()),
            ("limit", self.limit.to_string()),
            ("convert", convert.to_string()),
            ("sort", self.sort.clone()),
            ("sort_dir", self.sort_dir.as_str().to_string()),
        ]
    }
}

fn percent_change_field(window: Window) -> String {
    format!("percent_change_{}", window.as_str())
}
