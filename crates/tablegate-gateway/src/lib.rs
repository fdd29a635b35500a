//! HTTP surface of tablegate.
//!
//! Requests flow through authentication, the table allow-list, the schema
//! cache and the filter compiler before anything reaches the configured
//! [`TableSource`](tablegate_query::TableSource).

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod router;
pub mod state;

pub use auth::{AllowList, ApiKeyVerifier, API_KEY_HEADER};
pub use config::{BackendKind, ConfigError, GatewayConfig};
pub use error::GatewayError;
pub use openapi::ApiDoc;
pub use router::{build_application, configure_routes};
pub use state::AppState;
