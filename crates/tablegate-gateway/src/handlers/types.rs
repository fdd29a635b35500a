use serde::Serialize;
use serde_json::{Map, Value};
use tablegate_query::{ColumnDescriptor, TableSchema};
use utoipa::{IntoParams, ToSchema};

/// One page of rows from an exposed table
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "table": "orders",
    "data": [{"id": 1, "status": "SHIPPED"}],
    "count": 57,
    "returned": 1,
    "limit": 100,
    "offset": 0
}))]
pub struct TableRowsResponse {
    pub table: String,
    /// Rows as column → value objects
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Map<String, Value>>,
    /// Total rows matching the filters; `null` unless `count` was requested
    pub count: Option<u64>,
    /// Number of rows in `data`
    pub returned: usize,
    pub limit: u64,
    pub offset: u64,
}

/// Reserved query parameters of `GET /api/{table}`.
///
/// Any other key is a filter written `[operator__]column=value`, where the
/// operator is one of `eq`, `ne`, `gt`, `gte`, `lt`, `lte`, `like`, `ilike`,
/// `in` (comma-separated list) or `is` (`null`, `true`, `false`).
#[derive(Debug, IntoParams)]
#[into_params(parameter_in = Query)]
#[allow(dead_code)]
pub struct TableQueryParams {
    /// Comma-separated column list, `*` for all
    pub select: Option<String>,
    /// Column to sort by
    pub order: Option<String>,
    /// Sort descending
    pub desc: Option<bool>,
    /// Page size, clamped to the configured maximum
    pub limit: Option<i64>,
    /// Rows to skip
    pub offset: Option<i64>,
    /// Include the total number of matching rows
    pub count: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TablesResponse {
    pub allowed_tables: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type, or `unknown` when it could not be determined
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
}

impl From<&ColumnDescriptor> for ColumnInfo {
    fn from(column: &ColumnDescriptor) -> Self {
        Self {
            name: column.name.clone(),
            column_type: column.declared_type.clone(),
            nullable: column.nullable,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SchemaResponse {
    pub table: String,
    /// Empty when the schema could not be probed
    pub columns: Vec<ColumnInfo>,
}

impl From<&TableSchema> for SchemaResponse {
    fn from(schema: &TableSchema) -> Self {
        Self {
            table: schema.table.clone(),
            columns: schema.columns.iter().map(ColumnInfo::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvalidateResponse {
    pub table: String,
    /// Whether a cached schema was present and dropped
    pub invalidated: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    /// `connected` or `unreachable`
    pub database: String,
    /// Active backend (`postgres` or `postgrest`)
    pub backend: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub docs: String,
}
