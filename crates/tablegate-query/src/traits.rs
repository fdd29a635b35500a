use crate::error::Result;
use crate::types::*;
use async_trait::async_trait;

/// Core trait that all backing stores implement
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Get the type name of this data source
    fn source_type(&self) -> &'static str;

    /// Cheap connectivity check used by the health endpoint
    async fn ping(&self) -> Result<()>;
}

/// Discovers the column list of a table.
///
/// Implementations report an empty schema when the table exists but nothing
/// could be learned about it; errors are reserved for failed calls.
#[async_trait]
pub trait SchemaProbe: DataSource {
    async fn probe_schema(&self, table: &str) -> Result<TableSchema>;
}

/// Runs a compiled plan against the store.
///
/// Operands in the plan are untrusted input and must reach the store as bound
/// values, never as query text. Column and table names in the plan have been
/// validated and may be used as quoted identifiers.
#[async_trait]
pub trait QueryExecutor: DataSource {
    async fn execute(&self, plan: &QueryPlan) -> Result<QueryOutput>;
}

/// A store the gateway can both introspect and query
pub trait TableSource: SchemaProbe + QueryExecutor {}

impl<T> TableSource for T where T: SchemaProbe + QueryExecutor {}
