//! `GET /api/{table}`: filtered, paged reads from an exposed table

use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use tablegate_core::problemdetails::Problem;
use tablegate_query::compile;
use tracing::{debug, error};

use super::types::*;
use crate::error::GatewayError;
use crate::state::AppState;

/// Read rows from an exposed table
#[utoipa::path(
    tag = "Tables",
    get,
    path = "/api/{table}",
    params(
        ("table" = String, Path, description = "Name of an exposed table"),
        TableQueryParams
    ),
    responses(
        (status = 200, description = "Matching rows", body = TableRowsResponse),
        (status = 400, description = "Invalid column, operator or parameter", body = tablegate_core::ProblemDetails),
        (status = 401, description = "Missing or invalid X-API-Key", body = tablegate_core::ProblemDetails),
        (status = 404, description = "Table is not exposed", body = tablegate_core::ProblemDetails),
        (status = 502, description = "Backing store failed", body = tablegate_core::ProblemDetails)
    ),
    security(("api_key" = []))
)]
pub async fn read_table(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<TableRowsResponse>, Problem> {
    let table = state.allow_list.check(&table)?;

    let params: Vec<(String, String)> = serde_urlencoded::from_str(query.as_deref().unwrap_or(""))
        .map_err(|e| GatewayError::InvalidQueryString(e.to_string()))?;

    let schema = state.schema_for(table).await;

    let plan = compile(table, &params, &schema, &state.compile_options).map_err(|source| {
        GatewayError::Validation {
            table: table.to_string(),
            source,
        }
    })?;

    debug!(
        "Reading {}: {} filters, limit {}, offset {}",
        table,
        plan.filters.len(),
        plan.limit,
        plan.offset
    );

    let output = state.source.execute(&plan).await.map_err(|source| {
        error!("Query against table {} failed: {}", table, source);
        GatewayError::Backend {
            table: table.to_string(),
            source,
            expose_detail: state.expose_backend_errors,
        }
    })?;

    Ok(Json(TableRowsResponse {
        table: table.to_string(),
        returned: output.rows.len(),
        count: output.total_count,
        limit: plan.limit,
        offset: plan.offset,
        data: output.rows,
    }))
}
