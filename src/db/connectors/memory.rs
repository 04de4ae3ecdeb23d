use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ConnectionSummary, SchemaIntrospector};
use crate::db::schema::ColumnInfo;

/// Key for a registered table: (connection id, schema, table)
type TableKey = (String, Option<String>, String);

/// In-process schema introspector.
///
/// Serves fixed column sets for offline editing and tests. Lookups that were
/// never registered fail the same way the backend does for an unknown table.
pub struct InMemoryIntrospector {
    connections: RwLock<Vec<ConnectionSummary>>,
    tables: RwLock<HashMap<TableKey, Vec<ColumnInfo>>>,
    queries: RwLock<HashMap<(String, String), Vec<ColumnInfo>>>,
}

impl InMemoryIntrospector {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(Vec::new()),
            tables: RwLock::new(HashMap::new()),
            queries: RwLock::new(HashMap::new()),
        }
    }

    /// Register or replace a connection.
    pub async fn add_connection(&self, summary: ConnectionSummary) {
        let mut conns = self.connections.write().await;
        conns.retain(|c| c.id != summary.id);
        conns.push(summary);
    }

    /// Register the columns of a table.
    pub async fn add_table(
        &self,
        connection_id: &str,
        schema: Option<&str>,
        table: &str,
        columns: Vec<ColumnInfo>,
    ) {
        let key = (
            connection_id.to_string(),
            schema.map(str::to_string),
            table.to_string(),
        );
        self.tables.write().await.insert(key, columns);
    }

    /// Register the columns an ad-hoc query produces. The query text is
    /// matched after trimming.
    pub async fn add_query(&self, connection_id: &str, query: &str, columns: Vec<ColumnInfo>) {
        let key = (connection_id.to_string(), query.trim().to_string());
        self.queries.write().await.insert(key, columns);
    }
}

impl Default for InMemoryIntrospector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaIntrospector for InMemoryIntrospector {
    async fn list_connections(&self) -> anyhow::Result<Vec<ConnectionSummary>> {
        Ok(self.connections.read().await.clone())
    }

    async fn get_columns(
        &self,
        connection_id: &str,
        schema: Option<&str>,
        table: &str,
    ) -> anyhow::Result<Vec<ColumnInfo>> {
        let key = (
            connection_id.to_string(),
            schema.map(str::to_string),
            table.to_string(),
        );
        self.tables
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow!("Table '{}' not found on connection '{}'", table, connection_id))
    }

    async fn get_query_columns(
        &self,
        connection_id: &str,
        query: &str,
    ) -> anyhow::Result<Vec<ColumnInfo>> {
        let key = (connection_id.to_string(), query.trim().to_string());
        self.queries
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow!("Query could not be described on connection '{}'", connection_id))
    }
}
