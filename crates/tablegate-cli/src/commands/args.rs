use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tablegate_gateway::{BackendKind, GatewayConfig};
use tablegate_query::{SourceRegistry, TableSource};
use tablegate_query_postgres::PostgresSourceFactory;
use tablegate_query_postgrest::PostgrestSourceFactory;
use tracing::info;

/// Settings shared by every command that talks to the backing store
#[derive(Args, Clone)]
pub struct GatewayArgs {
    /// Shared secret clients send in the X-API-Key header
    #[arg(long, env = "INTERNAL_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Comma-separated list of tables to expose
    #[arg(long, env = "TABLEGATE_TABLES")]
    pub tables: String,

    /// Backing store: postgres (direct SQL) or postgrest (HTTP data API)
    #[arg(long, default_value = "postgres", env = "TABLEGATE_BACKEND")]
    pub backend: BackendKind,

    /// PostgreSQL connection URL
    #[arg(long, env = "SUPABASE_DB_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Database schema the exposed tables live in
    #[arg(long, default_value = "public", env = "TABLEGATE_DB_SCHEMA")]
    pub db_schema: String,

    /// Base URL of the PostgREST-compatible API
    #[arg(long, env = "SUPABASE_URL")]
    pub rest_url: Option<String>,

    /// API key for the PostgREST-compatible API
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub rest_key: Option<String>,

    /// Largest page a client may request
    #[arg(long, default_value_t = 1000, env = "TABLEGATE_MAX_LIMIT")]
    pub max_limit: u64,

    /// Page size when the client does not send `limit`
    #[arg(long, default_value_t = 100, env = "TABLEGATE_DEFAULT_LIMIT")]
    pub default_limit: u64,

    /// Reject column references while a table's schema is unknown
    #[arg(
        long,
        env = "TABLEGATE_STRICT_SCHEMA",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub strict_schema: bool,

    /// Include backing-store error messages in 502 responses
    #[arg(
        long,
        env = "TABLEGATE_EXPOSE_BACKEND_ERRORS",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub expose_backend_errors: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, env = "TABLEGATE_REQUEST_TIMEOUT")]
    pub request_timeout_secs: u64,

    /// Maximum number of requests served concurrently
    #[arg(long, default_value_t = 256, env = "TABLEGATE_MAX_IN_FLIGHT")]
    pub max_in_flight: usize,

    /// Size of the PostgreSQL connection pool
    #[arg(long, default_value_t = 20, env = "TABLEGATE_DB_MAX_CONNECTIONS")]
    pub db_max_connections: u32,
}

impl GatewayArgs {
    pub fn to_config(&self) -> GatewayConfig {
        let mut config = GatewayConfig::new(
            self.api_key.clone(),
            GatewayConfig::parse_table_list(&self.tables),
            self.backend,
        );
        config.database_url = self.database_url.clone();
        config.db_schema = self.db_schema.clone();
        config.rest_url = self.rest_url.clone();
        config.rest_key = self.rest_key.clone();
        config.max_limit = self.max_limit;
        config.default_limit = self.default_limit;
        config.strict_schema = self.strict_schema;
        config.expose_backend_errors = self.expose_backend_errors;
        config.request_timeout_secs = self.request_timeout_secs;
        config.max_in_flight = self.max_in_flight;
        config.db_max_connections = self.db_max_connections;
        config
    }

    /// Validated configuration, or an error naming the offending setting
    pub fn load(&self) -> anyhow::Result<GatewayConfig> {
        let config = self.to_config();
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Build the table source for the configured backend
pub async fn connect_source(config: &GatewayConfig) -> anyhow::Result<Arc<dyn TableSource>> {
    let registry = SourceRegistry::new();
    registry
        .register_factory(Arc::new(PostgresSourceFactory))
        .await;
    registry
        .register_factory(Arc::new(PostgrestSourceFactory))
        .await;

    let connection = config.connection_config();
    info!(
        "Connecting to {} backend at {}",
        config.backend,
        connection.connection_string()
    );

    registry
        .create_source(connection)
        .await
        .with_context(|| format!("Failed to create {} backend", config.backend))
}
