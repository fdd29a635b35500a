//! Gateway configuration and its startup validation

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tablegate_query::{CompileOptions, ConnectionConfig, DEFAULT_LIMIT, MAX_LIMIT};
use thiserror::Error;

pub const DEFAULT_DB_SCHEMA: &str = "public";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API key must not be empty")]
    MissingApiKey,

    #[error("At least one table must be exposed")]
    EmptyAllowList,

    #[error("Invalid table name '{0}': use letters, digits, '_' or '-'")]
    InvalidTableName(String),

    #[error("Table '{0}' is listed more than once")]
    DuplicateTable(String),

    #[error("Default limit {default_limit} must be between 1 and the maximum limit {max_limit}")]
    InvalidLimits { default_limit: u64, max_limit: u64 },

    #[error("The {backend} backend requires {setting}")]
    MissingBackendSetting {
        backend: BackendKind,
        setting: &'static str,
    },

    #[error("Invalid URL for {setting}: {reason}")]
    InvalidUrl {
        setting: &'static str,
        reason: String,
    },

    #[error("Unknown backend '{0}', expected 'postgres' or 'postgrest'")]
    UnknownBackend(String),

    #[error("{0} must be greater than zero")]
    ZeroSetting(&'static str),
}

/// Which backing-store strategy serves queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Direct SQL over a connection pool
    Postgres,
    /// PostgREST-compatible HTTP data API
    Postgrest,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::Postgrest => "postgrest",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "postgrest" | "supabase" => Ok(BackendKind::Postgrest),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Everything the gateway needs at startup
#[derive(Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    /// Exposed tables, in the order they were configured
    pub tables: Vec<String>,
    pub backend: BackendKind,
    pub database_url: Option<String>,
    pub db_schema: String,
    pub rest_url: Option<String>,
    pub rest_key: Option<String>,
    pub default_limit: u64,
    pub max_limit: u64,
    pub strict_schema: bool,
    pub expose_backend_errors: bool,
    pub request_timeout_secs: u64,
    pub max_in_flight: usize,
    pub db_max_connections: u32,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &"<redacted>")
            .field("tables", &self.tables)
            .field("backend", &self.backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("db_schema", &self.db_schema)
            .field("rest_url", &self.rest_url)
            .field("rest_key", &self.rest_key.as_ref().map(|_| "<redacted>"))
            .field("default_limit", &self.default_limit)
            .field("max_limit", &self.max_limit)
            .field("strict_schema", &self.strict_schema)
            .field("expose_backend_errors", &self.expose_backend_errors)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_in_flight", &self.max_in_flight)
            .field("db_max_connections", &self.db_max_connections)
            .finish()
    }
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>, tables: Vec<String>, backend: BackendKind) -> Self {
        Self {
            api_key: api_key.into(),
            tables,
            backend,
            database_url: None,
            db_schema: DEFAULT_DB_SCHEMA.to_string(),
            rest_url: None,
            rest_key: None,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            strict_schema: false,
            expose_backend_errors: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    }

    /// Split a comma-separated table list, trimming blanks
    pub fn parse_table_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        if self.tables.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !is_valid_table_name(table) {
                return Err(ConfigError::InvalidTableName(table.clone()));
            }
            if !seen.insert(table.as_str()) {
                return Err(ConfigError::DuplicateTable(table.clone()));
            }
        }

        if self.max_limit == 0 || self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigError::InvalidLimits {
                default_limit: self.default_limit,
                max_limit: self.max_limit,
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroSetting("request timeout"));
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroSetting("max in-flight requests"));
        }

        match self.backend {
            BackendKind::Postgres => {
                let url = require(&self.database_url, self.backend, "a database URL")?;
                check_url(url, "database URL", &["postgres", "postgresql"])?;
                if self.db_max_connections == 0 {
                    return Err(ConfigError::ZeroSetting("database max connections"));
                }
            }
            BackendKind::Postgrest => {
                let url = require(&self.rest_url, self.backend, "a REST URL")?;
                check_url(url, "REST URL", &["http", "https"])?;
                require(&self.rest_key, self.backend, "a REST API key")?;
            }
        }

        if self.db_schema.trim().is_empty() {
            return Err(ConfigError::MissingBackendSetting {
                backend: self.backend,
                setting: "a database schema",
            });
        }

        Ok(())
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            strict_schema: self.strict_schema,
        }
    }

    /// Connection settings for the configured backend's source factory
    pub fn connection_config(&self) -> ConnectionConfig {
        let config = ConnectionConfig::new(self.backend.as_str())
            .with_schema(self.db_schema.clone())
            .with_max_connections(self.db_max_connections)
            .with_timeout_secs(self.request_timeout_secs);

        match self.backend {
            BackendKind::Postgres => match &self.database_url {
                Some(url) => config.with_url(url.clone()),
                None => config,
            },
            BackendKind::Postgrest => {
                let config = match &self.rest_url {
                    Some(url) => config.with_url(url.clone()),
                    None => config,
                };
                match &self.rest_key {
                    Some(key) => config.with_api_key(key.clone()),
                    None => config,
                }
            }
        }
    }
}

fn require<'a>(
    value: &'a Option<String>,
    backend: BackendKind,
    setting: &'static str,
) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingBackendSetting { backend, setting })
}

fn check_url(raw: &str, setting: &'static str, schemes: &[&str]) -> Result<(), ConfigError> {
    let url = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        setting,
        reason: e.to_string(),
    })?;

    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidUrl {
            setting,
            reason: format!(
                "scheme '{}' is not one of {}",
                url.scheme(),
                schemes.join(", ")
            ),
        });
    }

    Ok(())
}

fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postgres_config() -> GatewayConfig {
        let mut config = GatewayConfig::new(
            "secret",
            vec!["orders".into(), "customers".into()],
            BackendKind::Postgres,
        );
        config.database_url = Some("postgres://reader:pw@localhost:5432/app".into());
        config
    }

    #[test]
    fn test_valid_postgres_config() {
        assert_eq!(postgres_config().validate(), Ok(()));
    }

    #[test]
    fn test_valid_postgrest_config() {
        let mut config = GatewayConfig::new("secret", vec!["orders".into()], BackendKind::Postgrest);
        config.rest_url = Some("https://project.supabase.co".into());
        config.rest_key = Some("anon".into());
        assert_eq!(config.validate(), Ok(()));

        let connection = config.connection_config();
        assert_eq!(connection.backend, "postgrest");
        assert_eq!(connection.api_key.as_deref(), Some("anon"));
    }

    #[test]
    fn test_rejects_blank_key_and_empty_allow_list() {
        let mut config = postgres_config();
        config.api_key = "  ".into();
        assert_eq!(config.validate(), Err(ConfigError::MissingApiKey));

        let mut config = postgres_config();
        config.tables.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyAllowList));
    }

    #[test]
    fn test_rejects_bad_table_names() {
        let mut config = postgres_config();
        config.tables.push("orders".into());
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateTable("orders".into()))
        );

        let mut config = postgres_config();
        config.tables.push("public.orders".into());
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTableName("public.orders".into()))
        );
    }

    #[test]
    fn test_rejects_inconsistent_limits() {
        let mut config = postgres_config();
        config.default_limit = 2000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLimits { .. })
        ));

        config.default_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLimits { .. })
        ));
    }

    #[test]
    fn test_backend_specific_settings_required() {
        let mut config = postgres_config();
        config.database_url = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingBackendSetting {
                backend: BackendKind::Postgres,
                ..
            })
        ));

        let mut config = GatewayConfig::new("secret", vec!["orders".into()], BackendKind::Postgrest);
        config.rest_url = Some("https://project.supabase.co".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingBackendSetting {
                backend: BackendKind::Postgrest,
                setting: "a REST API key",
            })
        ));
    }

    #[test]
    fn test_url_scheme_checked() {
        let mut config = postgres_config();
        config.database_url = Some("mysql://localhost/app".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_parse_table_list() {
        assert_eq!(
            GatewayConfig::parse_table_list(" orders, customers,,order_items "),
            vec!["orders", "customers", "order_items"]
        );
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("Postgres".parse::<BackendKind>(), Ok(BackendKind::Postgres));
        assert_eq!("postgrest".parse::<BackendKind>(), Ok(BackendKind::Postgrest));
        assert!("mysql".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", postgres_config());
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("pw@"));
    }

    #[test]
    fn test_compile_options_follow_config() {
        let mut config = postgres_config();
        config.max_limit = 50;
        config.default_limit = 20;
        config.strict_schema = true;
        let options = config.compile_options();
        assert_eq!(options.max_limit, 50);
        assert_eq!(options.default_limit, 20);
        assert!(options.strict_schema);
    }
}
