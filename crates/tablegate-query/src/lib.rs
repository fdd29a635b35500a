//! # tablegate-query
//!
//! Backend-agnostic pieces of the table gateway.
//!
//! - **compiler**: turns query-string parameters into a validated [`QueryPlan`]
//! - **schema_cache**: per-table column lists, probed once and memoized
//! - **traits**: the seam every backing store implements
//!   ([`SchemaProbe`] + [`QueryExecutor`] = [`TableSource`])
//! - **registry**: factories that build a [`TableSource`] from a
//!   [`ConnectionConfig`]
//!
//! ## Example
//!
//! ```rust
//! use tablegate_query::{compile, ColumnDescriptor, CompileOptions, Selection, TableSchema};
//!
//! let schema = TableSchema::new(
//!     "orders",
//!     vec![ColumnDescriptor::new("status", "text", true)],
//! );
//! let params = vec![("status".to_string(), "SHIPPED".to_string())];
//!
//! let plan = compile("orders", &params, &schema, &CompileOptions::default()).unwrap();
//! assert_eq!(plan.selection, Selection::All);
//! assert_eq!(plan.filters.len(), 1);
//! assert_eq!(plan.limit, 100);
//! ```
//!
//! Backend crates:
//! - `tablegate-query-postgres` - direct SQL over a pooled connection
//! - `tablegate-query-postgrest` - PostgREST-compatible HTTP data API

pub mod compiler;
pub mod error;
pub mod registry;
pub mod schema_cache;
pub mod traits;
pub mod types;

pub use compiler::{compile, is_reserved, CompileOptions, DEFAULT_LIMIT, MAX_LIMIT};
pub use error::{QueryError, Result, ValidationError};
pub use registry::{ConnectionConfig, SourceFactory, SourceRegistry};
pub use schema_cache::SchemaCache;
pub use traits::{DataSource, QueryExecutor, SchemaProbe, TableSource};
pub use types::{
    ColumnDescriptor, ColumnRef, DataRow, FilterClause, IsLiteral, NativeType, Operand,
    Operator, OrderBy, QueryOutput, QueryPlan, Selection, SortDirection, TableSchema,
};
