//! PostgREST backend for tablegate-query
//!
//! Talks to a PostgREST-compatible data API (for example Supabase's
//! `/rest/v1`) over HTTP. Operands travel as URL-encoded query values and are
//! interpreted by the remote API, never spliced into SQL here.

pub mod request;

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;
use tablegate_query::{
    ConnectionConfig, DataRow, DataSource, QueryError, QueryExecutor, QueryOutput, QueryPlan,
    Result, SchemaProbe, SourceFactory, TableSchema, TableSource,
};
use tracing::debug;
use url::Url;

pub const BACKEND_TYPE: &str = "postgrest";

const REST_PATH: [&str; 2] = ["rest", "v1"];

/// Longest slice of an error body carried into error messages
const MAX_ERROR_BODY: usize = 512;

/// Rows from one REST call plus the total reported in `Content-Range`
struct Page {
    rows: Vec<DataRow>,
    total: Option<u64>,
}

/// PostgREST table source
pub struct PostgrestSource {
    client: Client,
    base_url: Url,
    api_key: String,
    schema: String,
}

impl PostgrestSource {
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let base_url = Url::parse(config.require_url()?)
            .map_err(|e| QueryError::invalid_configuration(format!("Invalid REST URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(QueryError::invalid_configuration(
                "REST URL must be an http(s) base URL",
            ));
        }

        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                QueryError::invalid_configuration("postgrest backend requires an API key")
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                QueryError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            schema: config.schema.clone(),
        })
    }

    /// `<base>/rest/v1/<segment>`; an empty segment yields the API root
    fn endpoint(&self, segment: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| QueryError::invalid_configuration("REST URL cannot be a base"))?
            .pop_if_empty()
            .extend(REST_PATH)
            .push(segment);
        Ok(url)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept-Profile", &self.schema)
    }

    async fn fetch(&self, request: RequestBuilder) -> Result<Page> {
        let response = request
            .send()
            .await
            .map_err(|e| QueryError::ConnectionFailed(format!("REST request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(QueryError::QueryFailed(format!(
                "REST API returned status {}: {}",
                status, body
            )));
        }

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(request::parse_content_range);

        let rows = response
            .json::<Vec<DataRow>>()
            .await
            .map_err(|e| QueryError::SerializationError(format!("Invalid REST response: {}", e)))?;

        Ok(Page { rows, total })
    }
}

#[async_trait]
impl DataSource for PostgrestSource {
    fn source_type(&self) -> &'static str {
        BACKEND_TYPE
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .get(self.endpoint("")?)
            .send()
            .await
            .map_err(|e| QueryError::ConnectionFailed(format!("REST API unreachable: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(QueryError::ConnectionFailed(format!(
                "REST API answered {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl SchemaProbe for PostgrestSource {
    async fn probe_schema(&self, table: &str) -> Result<TableSchema> {
        let request = self
            .get(self.endpoint(table)?)
            .query(&[("select", "*"), ("limit", "1")]);

        let page = self.fetch(request).await.map_err(|e| {
            QueryError::SchemaError(format!("Failed to sample {}: {}", table, e))
        })?;

        debug!(
            "Sampled {} for schema ({} rows)",
            table,
            page.rows.len()
        );
        Ok(request::schema_from_sample(table, page.rows.first()))
    }
}

#[async_trait]
impl QueryExecutor for PostgrestSource {
    async fn execute(&self, plan: &QueryPlan) -> Result<QueryOutput> {
        let pairs = request::query_pairs(plan);
        debug!("Querying {} with {:?}", plan.table, pairs);

        let mut request = self.get(self.endpoint(&plan.table)?).query(&pairs);
        if plan.want_count {
            request = request.header("Prefer", "count=exact");
        }

        let page = self.fetch(request).await?;
        let total_count = if plan.want_count { page.total } else { None };

        Ok(QueryOutput::new(page.rows, total_count))
    }
}

/// Builds [`PostgrestSource`]s for the `postgrest` backend
pub struct PostgrestSourceFactory;

#[async_trait]
impl SourceFactory for PostgrestSourceFactory {
    fn backend_type(&self) -> &'static str {
        BACKEND_TYPE
    }

    async fn create_source(&self, config: ConnectionConfig) -> Result<Arc<dyn TableSource>> {
        debug!("Creating REST source for {}", config.connection_string());
        Ok(Arc::new(PostgrestSource::new(&config)?))
    }
}
