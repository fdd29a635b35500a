//! Allow-list and schema metadata

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tablegate_core::problemdetails::Problem;
use tracing::info;

use super::types::*;
use crate::state::AppState;

/// List exposed tables
#[utoipa::path(
    tag = "Metadata",
    get,
    path = "/api/meta/tables",
    responses(
        (status = 200, description = "Exposed tables in configured order", body = TablesResponse),
        (status = 401, description = "Missing or invalid X-API-Key", body = tablegate_core::ProblemDetails)
    ),
    security(("api_key" = []))
)]
pub async fn list_tables(State(state): State<Arc<AppState>>) -> Json<TablesResponse> {
    let tables = state.allow_list.tables().to_vec();
    Json(TablesResponse {
        total: tables.len(),
        allowed_tables: tables,
    })
}

/// Describe the columns of an exposed table
#[utoipa::path(
    tag = "Metadata",
    get,
    path = "/api/meta/schema/{table}",
    params(("table" = String, Path, description = "Name of an exposed table")),
    responses(
        (status = 200, description = "Cached column list", body = SchemaResponse),
        (status = 401, description = "Missing or invalid X-API-Key", body = tablegate_core::ProblemDetails),
        (status = 404, description = "Table is not exposed", body = tablegate_core::ProblemDetails)
    ),
    security(("api_key" = []))
)]
pub async fn table_schema(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> Result<Json<SchemaResponse>, Problem> {
    let table = state.allow_list.check(&table)?;
    let schema = state.schema_for(table).await;
    Ok(Json(SchemaResponse::from(schema.as_ref())))
}

/// Drop the cached schema of an exposed table so the next request probes again
#[utoipa::path(
    tag = "Metadata",
    delete,
    path = "/api/meta/schema/{table}",
    params(("table" = String, Path, description = "Name of an exposed table")),
    responses(
        (status = 200, description = "Cache entry dropped, if present", body = InvalidateResponse),
        (status = 401, description = "Missing or invalid X-API-Key", body = tablegate_core::ProblemDetails),
        (status = 404, description = "Table is not exposed", body = tablegate_core::ProblemDetails)
    ),
    security(("api_key" = []))
)]
pub async fn invalidate_schema(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> Result<Json<InvalidateResponse>, Problem> {
    let table = state.allow_list.check(&table)?;
    let invalidated = state.schema_cache.invalidate(table).await;
    info!(
        "Schema cache invalidation for {} (entry present: {})",
        table, invalidated
    );

    Ok(Json(InvalidateResponse {
        table: table.to_string(),
        invalidated,
    }))
}
