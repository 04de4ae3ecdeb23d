pub mod memory;

use crate::db::schema::ColumnInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Storage model of a connector, which decides the native type vocabulary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// Row-oriented relational engine
    Relational,
    /// Columnar analytical warehouse
    Columnar,
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorKind::Relational => write!(f, "relational"),
            ConnectorKind::Columnar => write!(f, "columnar"),
        }
    }
}

/// Connection types the backend can register
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Mssql,
    Bigquery,
}

impl ConnectionType {
    /// The type vocabulary this connection reports columns in.
    pub fn kind(self) -> ConnectorKind {
        match self {
            ConnectionType::Mssql => ConnectorKind::Relational,
            ConnectionType::Bigquery => ConnectorKind::Columnar,
        }
    }

    /// Label the editor uses for the schema level of a table path.
    pub fn schema_label(self) -> &'static str {
        match self {
            ConnectionType::Mssql => "Schema",
            ConnectionType::Bigquery => "Dataset",
        }
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::Mssql => write!(f, "SQL Server"),
            ConnectionType::Bigquery => write!(f, "BigQuery"),
        }
    }
}

/// A registered connection as listed by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Look up the connection type for an id, falling back to `default` when the
/// id is absent or unknown.
pub fn resolve_connection_type(
    connections: &[ConnectionSummary],
    connection_id: Option<&str>,
    default: ConnectionType,
) -> ConnectionType {
    connection_id
        .and_then(|id| connections.iter().find(|c| c.id == id))
        .map(|c| c.connection_type)
        .unwrap_or(default)
}

/// Schema introspection service consumed by the mapping editor.
///
/// The production implementation talks to the backend over HTTP; this crate
/// only depends on the trait.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// List the connections the current user can see
    async fn list_connections(&self) -> anyhow::Result<Vec<ConnectionSummary>>;

    /// Columns of a table, in ordinal order
    async fn get_columns(
        &self,
        connection_id: &str,
        schema: Option<&str>,
        table: &str,
    ) -> anyhow::Result<Vec<ColumnInfo>>;

    /// Columns produced by an ad-hoc query
    async fn get_query_columns(
        &self,
        connection_id: &str,
        query: &str,
    ) -> anyhow::Result<Vec<ColumnInfo>>;
}
