use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::SharedPipeline;
use crate::directive::{MasterParams, QueryDirective};
use crate::error::QueryError;
use crate::metrics::EndpointMetrics;
use crate::types::{CanonicalRecord, PaginationMeta, StatusBlock};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    ok: bool,
    timestamp: DateTime<Utc>,
    provider: &'static str,
    upstream: Vec<EndpointMetrics>,
}

#[derive(Debug, Serialize)]
pub struct SortInfo {
    by: &'static str,
    period: &'static str,
    direction: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MasterResponse {
    status: StatusBlock,
    data: Vec<CanonicalRecord>,
    pagination: PaginationMeta,
    filter: Option<&'static str>,
    sort: SortInfo,
    search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SymbolResponse {
    status: StatusBlock,
    data: CanonicalRecord,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: StatusBlock,
}

/// Error wrapper rendering any [`QueryError`] in the response envelope
#[derive(Debug)]
pub struct ApiError(QueryError);

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.error_code();
        if code >= 500 {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }

        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorBody {
            status: StatusBlock::error(code, self.0.public_message()),
        });

        (status, body).into_response()
    }
}

pub async fn health(State(pipeline): State<SharedPipeline>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        timestamp: Utc::now(),
        provider: pipeline.provider_name(),
        upstream: pipeline.upstream_metrics().await,
    })
}

pub async fn get_master(
    State(pipeline): State<SharedPipeline>,
    params: Result<Query<MasterParams>, QueryRejection>,
) -> Result<Json<MasterResponse>, ApiError> {
    let Query(params) = params.map_err(|e| QueryError::validation("query", e.body_text()))?;
    let directive = QueryDirective::from_params(&params)?;

    let result = pipeline.run(&directive).await?;

    let by = match directive.filter {
        Some(_) => "percent_change",
        None => directive.sort_by.as_str(),
    };

    Ok(Json(MasterResponse {
        status: StatusBlock::ok(),
        data: result.data,
        pagination: result.pagination,
        filter: directive.filter.map(|f| f.as_str()),
        sort: SortInfo {
            by,
            period: directive
                .resolved_period()
                .unwrap_or(directive.sort_period)
                .as_str(),
            direction: directive.effective_direction().as_str(),
        },
        search: directive.search_term().map(str::to_string),
    }))
}

pub async fn get_symbol(
    Path(symbol): Path<String>,
    State(pipeline): State<SharedPipeline>,
) -> Result<Json<SymbolResponse>, ApiError> {
    let record = pipeline.lookup(&symbol).await?;

    Ok(Json(SymbolResponse {
        status: StatusBlock::ok(),
        data: record,
    }))
}
