use crate::error::{QueryError, Result};
use crate::traits::TableSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Connection configuration for creating table sources
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Backend type identifier (postgres, postgrest)
    pub backend: String,
    /// Database URL or REST base URL
    pub url: Option<String>,
    /// API key for REST backends
    pub api_key: Option<String>,
    /// Database schema the exposed tables live in
    pub schema: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// Per-call timeout towards the store
    pub timeout_secs: u64,
}

impl ConnectionConfig {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            url: None,
            api_key: None,
            schema: "public".to_string(),
            max_connections: 20,
            timeout_secs: 30,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// URL that must be present, or an `InvalidConfiguration` error
    pub fn require_url(&self) -> Result<&str> {
        self.url.as_deref().filter(|u| !u.is_empty()).ok_or_else(|| {
            QueryError::invalid_configuration(format!("{} backend requires a URL", self.backend))
        })
    }

    /// Get connection string for display purposes (without credentials)
    pub fn connection_string(&self) -> String {
        let target = match &self.url {
            Some(url) => redact_userinfo(url),
            None => "<unset>".to_string(),
        };
        format!("{}://{}#{}", self.backend, target, self.schema)
    }
}

fn redact_userinfo(url: &str) -> String {
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, url),
    };

    let host_part = match rest.rsplit_once('@') {
        Some((_, host)) => host,
        None => rest,
    };

    match scheme {
        Some(scheme) => format!("{}://{}", scheme, host_part),
        None => host_part.to_string(),
    }
}

/// Factory trait for creating table sources from configurations
#[async_trait]
pub trait SourceFactory: Send + Sync {
    /// Get the backend type this factory handles
    fn backend_type(&self) -> &'static str;

    /// Create a table source from configuration
    async fn create_source(&self, config: ConnectionConfig) -> Result<Arc<dyn TableSource>>;
}

/// Registry of backend factories, keyed by backend type
pub struct SourceRegistry {
    factories: RwLock<HashMap<String, Arc<dyn SourceFactory>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Register a factory for a backend type
    pub async fn register_factory(&self, factory: Arc<dyn SourceFactory>) {
        let backend = factory.backend_type();
        let mut factories = self.factories.write().await;

        if factories.contains_key(backend) {
            warn!("Overwriting existing factory for backend: {}", backend);
        }

        factories.insert(backend.to_string(), factory);
        debug!("Registered factory for backend: {}", backend);
    }

    /// Create a new table source for the configured backend
    pub async fn create_source(&self, config: ConnectionConfig) -> Result<Arc<dyn TableSource>> {
        let factory = self
            .factories
            .read()
            .await
            .get(&config.backend)
            .cloned()
            .ok_or_else(|| {
                QueryError::InvalidConfiguration(format!(
                    "No factory registered for backend: {}",
                    config.backend
                ))
            })?;

        debug!("Creating source for {}", config.connection_string());

        factory.create_source(config).await
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
