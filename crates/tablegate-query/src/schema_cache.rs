use crate::traits::SchemaProbe;
use crate::types::TableSchema;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Process-wide memo of table schemas, keyed by table name.
///
/// Entries are populated on first use and kept until invalidated. A failed
/// probe is cached as an empty schema so a broken table does not hammer the
/// store on every request.
#[derive(Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached schema for `table`, if any
    pub async fn get(&self, table: &str) -> Option<Arc<TableSchema>> {
        self.entries.read().await.get(table).cloned()
    }

    /// Return the cached schema or probe the store and cache the result.
    ///
    /// The probe runs without holding the lock. When two callers race on a
    /// cold entry both may probe, and the first insert wins so every caller
    /// sees the same schema afterwards.
    pub async fn get_or_populate<P>(&self, probe: &P, table: &str) -> Arc<TableSchema>
    where
        P: SchemaProbe + ?Sized,
    {
        if let Some(schema) = self.get(table).await {
            return schema;
        }

        let schema = match probe.probe_schema(table).await {
            Ok(schema) => {
                debug!(
                    "Probed schema for table {} ({} columns)",
                    table,
                    schema.columns.len()
                );
                schema
            }
            Err(e) => {
                warn!(
                    "Schema probe for table {} failed, caching empty schema: {}",
                    table, e
                );
                TableSchema::empty(table)
            }
        };

        let mut entries = self.entries.write().await;
        entries
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(schema))
            .clone()
    }

    /// Drop the entry for `table`. Returns whether one was present.
    pub async fn invalidate(&self, table: &str) -> bool {
        let removed = self.entries.write().await.remove(table).is_some();
        if removed {
            debug!("Invalidated cached schema for table {}", table);
        }
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn cached_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self.entries.read().await.keys().cloned().collect();
        tables.sort();
        tables
    }
}
