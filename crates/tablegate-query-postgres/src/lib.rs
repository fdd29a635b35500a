//! PostgreSQL backend for tablegate-query
//!
//! Implements SchemaProbe and QueryExecutor over a pooled sea-orm connection.

pub mod sql;

use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, FromQueryResult,
};
use std::sync::Arc;
use std::time::Duration;
use tablegate_query::{
    ColumnDescriptor, ConnectionConfig, DataRow, DataSource, NativeType, QueryError,
    QueryExecutor, QueryOutput, QueryPlan, Result, SchemaProbe, SourceFactory, TableSchema,
    TableSource,
};
use tracing::{debug, error};

pub const BACKEND_TYPE: &str = "postgres";

/// PostgreSQL table source
pub struct PostgresSource {
    db: Arc<DatabaseConnection>,
    schema: String,
}

#[derive(Debug, FromQueryResult)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    is_nullable: String,
    udt_schema: Option<String>,
    udt_name: String,
}

impl From<ColumnRow> for ColumnDescriptor {
    fn from(row: ColumnRow) -> Self {
        ColumnDescriptor::new(
            row.column_name,
            row.data_type,
            row.is_nullable.eq_ignore_ascii_case("YES"),
        )
        .with_native_type(NativeType::new(row.udt_schema, row.udt_name))
    }
}

fn map_db_err(e: DbErr) -> QueryError {
    match e {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => QueryError::ConnectionFailed(e.to_string()),
        other => QueryError::QueryFailed(other.to_string()),
    }
}

impl PostgresSource {
    /// Build a connection pool described by `config`.
    ///
    /// The pool is lazy: nothing is dialled until the first query or ping, so an
    /// unreachable database surfaces through `ping` rather than here.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let url = config.require_url()?;

        let mut opt = ConnectOptions::new(url.to_owned());
        opt.max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .acquire_timeout(Duration::from_secs(config.timeout_secs))
            .connect_lazy(true)
            .sqlx_logging(false);

        debug!("Connecting to PostgreSQL: {}", config.connection_string());

        let db = Database::connect(opt).await.map_err(|e| {
            error!("PostgreSQL connection failed: {}", e);
            QueryError::ConnectionFailed(format!("PostgreSQL connection failed: {}", e))
        })?;

        Ok(Self::from_connection(Arc::new(db), config.schema.clone()))
    }

    /// Wrap an existing connection; tables are looked up in `schema`
    pub fn from_connection(db: Arc<DatabaseConnection>, schema: impl Into<String>) -> Self {
        Self {
            db,
            schema: schema.into(),
        }
    }
}

#[async_trait]
impl DataSource for PostgresSource {
    fn source_type(&self) -> &'static str {
        BACKEND_TYPE
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await.map_err(map_db_err)
    }
}

#[async_trait]
impl SchemaProbe for PostgresSource {
    async fn probe_schema(&self, table: &str) -> Result<TableSchema> {
        let rows = ColumnRow::find_by_statement(sql::describe_table(&self.schema, table))
            .all(self.db.as_ref())
            .await
            .map_err(|e| QueryError::SchemaError(format!("Failed to describe {}: {}", table, e)))?;

        Ok(TableSchema::new(
            table,
            rows.into_iter().map(ColumnDescriptor::from).collect(),
        ))
    }
}

#[async_trait]
impl QueryExecutor for PostgresSource {
    async fn execute(&self, plan: &QueryPlan) -> Result<QueryOutput> {
        let statements = sql::build_select(&self.schema, plan)?;
        debug!("Executing on {}: {}", plan.table, statements.rows.sql);

        let results = self
            .db
            .query_all(statements.rows)
            .await
            .map_err(map_db_err)?;

        let rows = results
            .iter()
            .map(|result| {
                match result
                    .try_get::<serde_json::Value>("", "row")
                    .map_err(|e| QueryError::SerializationError(e.to_string()))?
                {
                    serde_json::Value::Object(map) => Ok(map),
                    other => Err(QueryError::SerializationError(format!(
                        "Expected a JSON object per row, got {}",
                        other
                    ))),
                }
            })
            .collect::<Result<Vec<DataRow>>>()?;

        let total_count = match statements.count {
            Some(statement) => {
                let total = self
                    .db
                    .query_one(statement)
                    .await
                    .map_err(map_db_err)?
                    .map(|row| row.try_get::<i64>("", "total"))
                    .transpose()
                    .map_err(|e| QueryError::SerializationError(e.to_string()))?
                    .unwrap_or(0);
                Some(total.max(0) as u64)
            }
            None => None,
        };

        Ok(QueryOutput::new(rows, total_count))
    }
}

/// Builds [`PostgresSource`]s for the `postgres` backend
pub struct PostgresSourceFactory;

#[async_trait]
impl SourceFactory for PostgresSourceFactory {
    fn backend_type(&self) -> &'static str {
        BACKEND_TYPE
    }

    async fn create_source(&self, config: ConnectionConfig) -> Result<Arc<dyn TableSource>> {
        let source = PostgresSource::connect(&config).await?;
        Ok(Arc::new(source))
    }
}
