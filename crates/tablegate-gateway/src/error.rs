//! Error types for the gateway's HTTP surface

use tablegate_core::problemdetails::Problem;
use tablegate_core::{
    bad_gateway, bad_request, internal_server_error, not_found, service_unavailable, unauthorized,
};
use tablegate_query::{QueryError, ValidationError};
use thiserror::Error;

/// Everything a request can fail with, each mapped to one status code
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Missing or invalid API key")]
    Unauthorized,

    #[error("Table '{0}' is not available")]
    TableNotAllowed(String),

    #[error("Invalid query for table '{table}': {source}")]
    Validation {
        table: String,
        source: ValidationError,
    },

    #[error("Malformed query string: {0}")]
    InvalidQueryString(String),

    #[error("Query against table '{table}' failed: {source}")]
    Backend {
        table: String,
        source: QueryError,
        /// Include the store's message in the response body
        expose_detail: bool,
    },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GatewayError> for Problem {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Unauthorized => unauthorized().build(),

            GatewayError::TableNotAllowed(table) => not_found()
                .title("Table Not Found")
                .detail(format!("Table '{}' is not available", table))
                .value("table", table)
                .build(),

            GatewayError::Validation { table, source } => {
                let columns = source.columns();
                let mut builder = bad_request()
                    .title("Invalid Query")
                    .detail(source.to_string())
                    .value("table", &table);
                if !columns.is_empty() {
                    builder = builder.value("columns", columns);
                }
                builder.build()
            }

            GatewayError::InvalidQueryString(msg) => bad_request()
                .title("Invalid Query String")
                .detail(msg)
                .build(),

            GatewayError::Backend {
                table,
                source,
                expose_detail,
            } => {
                let detail = if expose_detail {
                    format!("Query against table '{}' failed: {}", table, source)
                } else {
                    format!("Query against table '{}' failed", table)
                };
                bad_gateway().detail(detail).value("table", table).build()
            }

            GatewayError::Unavailable(msg) => service_unavailable().detail(msg).build(),

            GatewayError::Internal(_) => internal_server_error().build(),
        }
    }
}
