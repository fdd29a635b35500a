use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{
    ColumnInfo, HealthResponse, InvalidateResponse, SchemaResponse, ServiceInfo,
    TableRowsResponse, TablesResponse,
};

/// OpenAPI documentation for the gateway
#[derive(OpenApi)]
#[openapi(
    info(
        title = "tablegate",
        description = "Read-only HTTP access to an allow-listed set of database tables"
    ),
    paths(
        crate::handlers::read_table,
        crate::handlers::list_tables,
        crate::handlers::table_schema,
        crate::handlers::invalidate_schema,
        crate::handlers::health,
        crate::handlers::root,
    ),
    components(
        schemas(
            TableRowsResponse,
            TablesResponse,
            SchemaResponse,
            ColumnInfo,
            InvalidateResponse,
            HealthResponse,
            ServiceInfo,
            tablegate_core::ProblemDetails,
        )
    ),
    modifiers(&ApiKeyAddon),
    tags(
        (name = "Tables", description = "Filtered reads from exposed tables"),
        (name = "Metadata", description = "Allow-list and schema information"),
        (name = "Service", description = "Health and service information")
    )
)]
pub struct ApiDoc;

/// Registers the `X-API-Key` header scheme referenced as `api_key`
struct ApiKeyAddon;

impl Modify for ApiKeyAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "X-API-Key",
                "Shared secret configured on the gateway",
            ))),
        );
    }
}
