use std::sync::Arc;
use tablegate_query::{CompileOptions, SchemaCache, TableSchema, TableSource};

use crate::auth::{AllowList, ApiKeyVerifier};
use crate::config::GatewayConfig;

/// State shared by every request
pub struct AppState {
    pub source: Arc<dyn TableSource>,
    pub schema_cache: SchemaCache,
    pub allow_list: AllowList,
    pub verifier: ApiKeyVerifier,
    pub compile_options: CompileOptions,
    pub expose_backend_errors: bool,
}

impl AppState {
    pub fn new(config: &GatewayConfig, source: Arc<dyn TableSource>) -> Self {
        Self {
            source,
            schema_cache: SchemaCache::new(),
            allow_list: AllowList::new(config.tables.iter().cloned()),
            verifier: ApiKeyVerifier::new(&config.api_key),
            compile_options: config.compile_options(),
            expose_backend_errors: config.expose_backend_errors,
        }
    }

    /// Cached schema for an allow-listed table, probing on first use
    pub async fn schema_for(&self, table: &str) -> Arc<TableSchema> {
        self.schema_cache
            .get_or_populate(self.source.as_ref(), table)
            .await
    }
}
