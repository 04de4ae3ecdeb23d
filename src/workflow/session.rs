//! Editing session for the column mapping of one node.
//!
//! A session gathers the live column metadata on both sides of a destination
//! or transform node, hands the mapping set to the edit API, and writes the
//! result back into the workflow definition on commit.

use anyhow::{anyhow, Context};
use futures_util::future::join;

use super::{NodeConfig, SourceConfig, WorkflowDefinition, WorkflowError, WorkflowNode};
use crate::config::FlowmapConfig;
use crate::db::connectors::{resolve_connection_type, ConnectorKind, SchemaIntrospector};
use crate::db::mapping::{self, display_types, DisplayTypes, MappingReport, MappingSet};
use crate::db::schema::{descriptors, ColumnDescriptor, ColumnInfo};

/// Where a node's rows come from or go to
struct TableRef<'a> {
    connection_id: Option<&'a str>,
    schema: Option<&'a str>,
    table: Option<&'a str>,
    query: Option<&'a str>,
}

impl<'a> From<&'a SourceConfig> for TableRef<'a> {
    fn from(c: &'a SourceConfig) -> Self {
        TableRef {
            connection_id: c.connection_id.as_deref(),
            schema: c.schema.as_deref(),
            table: c.table.as_deref(),
            query: c.custom_query(),
        }
    }
}

async fn fetch_columns(
    introspector: &dyn SchemaIntrospector,
    target: Option<TableRef<'_>>,
) -> anyhow::Result<Vec<ColumnInfo>> {
    let Some(target) = target else {
        return Ok(Vec::new());
    };
    let Some(connection_id) = target.connection_id.filter(|c| !c.is_empty()) else {
        return Ok(Vec::new());
    };
    if let Some(query) = target.query {
        return introspector
            .get_query_columns(connection_id, query)
            .await
            .with_context(|| format!("fetching query columns on connection '{}'", connection_id));
    }
    match target.table.filter(|t| !t.is_empty()) {
        Some(table) => introspector
            .get_columns(connection_id, target.schema, table)
            .await
            .with_context(|| format!("fetching columns of '{}' on connection '{}'", table, connection_id)),
        None => Ok(Vec::new()),
    }
}

fn degrade(side: &str, node_id: &str, result: anyhow::Result<Vec<ColumnInfo>>) -> Vec<ColumnDescriptor> {
    match result {
        Ok(cols) => descriptors(&cols),
        Err(e) => {
            log::warn!("No {} columns for node '{}': {:#}", side, node_id, e);
            Vec::new()
        }
    }
}

pub struct MappingSession {
    node_id: String,
    source_kind: ConnectorKind,
    dest_kind: ConnectorKind,
    source_columns: Vec<ColumnDescriptor>,
    dest_columns: Vec<ColumnDescriptor>,
    saved: MappingSet,
    mappings: MappingSet,
}

impl MappingSession {
    /// Open a session on the destination or transform node `node_id`.
    ///
    /// Only a missing or unmappable node is an error. Introspection failures
    /// leave the affected column list empty.
    pub async fn open(
        definition: &WorkflowDefinition,
        node_id: &str,
        introspector: &dyn SchemaIntrospector,
        config: &FlowmapConfig,
    ) -> anyhow::Result<Self> {
        let node = definition
            .node(node_id)
            .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))
            .context("opening mapping session")?;
        let dest = match &node.config {
            NodeConfig::Destination(c) => Some(TableRef {
                connection_id: c.connection_id.as_deref(),
                schema: c.schema.as_deref(),
                table: c.table.as_deref(),
                query: None,
            }),
            NodeConfig::Transform(_) => None,
            other => {
                return Err(anyhow!(WorkflowError::NotMappable {
                    node_id: node_id.to_string(),
                    kind: other.kind(),
                }))
            }
        };

        let source = definition
            .find_upstream_source(node_id, config.upstream_search_depth)
            .and_then(|n: &WorkflowNode| match &n.config {
                NodeConfig::Source(c) => Some(c),
                _ => None,
            });
        if source.is_none() {
            log::debug!("Node '{}' has no upstream source", node_id);
        }

        let connections = match introspector.list_connections().await {
            Ok(conns) => conns,
            Err(e) => {
                log::warn!("Could not list connections: {:#}", e);
                Vec::new()
            }
        };
        let default_type = config.default_connection_type;
        let source_kind = resolve_connection_type(
            &connections,
            source.and_then(|s| s.connection_id.as_deref()),
            default_type,
        )
        .kind();
        let dest_kind = match &dest {
            Some(d) => resolve_connection_type(&connections, d.connection_id, default_type).kind(),
            None => source_kind,
        };

        let (source_result, dest_result) = join(
            fetch_columns(introspector, source.map(TableRef::from)),
            fetch_columns(introspector, dest),
        )
        .await;
        let source_columns = degrade("source", node_id, source_result);
        let dest_columns = degrade("destination", node_id, dest_result);

        log::debug!(
            "Opened mapping session on '{}': {} source ({}), {} destination ({}) columns",
            node_id,
            source_columns.len(),
            source_kind,
            dest_columns.len(),
            dest_kind
        );

        let saved = definition.column_mappings(node_id).cloned().unwrap_or_default();
        Ok(Self {
            node_id: node_id.to_string(),
            source_kind,
            dest_kind,
            source_columns,
            dest_columns,
            mappings: saved.clone(),
            saved,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn source_kind(&self) -> ConnectorKind {
        self.source_kind
    }

    pub fn dest_kind(&self) -> ConnectorKind {
        self.dest_kind
    }

    pub fn source_columns(&self) -> &[ColumnDescriptor] {
        &self.source_columns
    }

    pub fn dest_columns(&self) -> &[ColumnDescriptor] {
        &self.dest_columns
    }

    pub fn mappings(&self) -> &MappingSet {
        &self.mappings
    }

    /// Rebuild the set from the live columns. Does nothing without source
    /// columns; maps each source column onto itself without destination
    /// columns.
    pub fn auto_map(&mut self) {
        if self.source_columns.is_empty() {
            log::debug!("Auto-map on '{}' skipped: no source columns", self.node_id);
            return;
        }
        self.mappings = if self.dest_columns.is_empty() {
            mapping::identity_map(&self.source_columns)
        } else {
            mapping::auto_map(
                &self.source_columns,
                &self.dest_columns,
                self.source_kind,
                self.dest_kind,
            )
        };
    }

    /// Run an edit over the current set.
    pub fn apply(&mut self, edit: impl FnOnce(MappingSet) -> MappingSet) {
        let current = std::mem::take(&mut self.mappings);
        self.mappings = edit(current);
    }

    /// Append an entry for the next unmapped source column.
    pub fn add_entry(&mut self) {
        let current = std::mem::take(&mut self.mappings);
        self.mappings = current.add_entry(&self.source_columns);
    }

    pub fn review(&self) -> MappingReport {
        self.mappings.review(&self.source_columns)
    }

    pub fn display_types(&self, index: usize) -> Option<DisplayTypes> {
        self.mappings
            .get(index)
            .map(|entry| display_types(entry, &self.source_columns, &self.dest_columns))
    }

    /// Whether the set differs from what the definition holds.
    pub fn is_dirty(&self) -> bool {
        self.mappings != self.saved
    }

    /// Write the current set into `definition`.
    pub fn commit(&mut self, definition: &mut WorkflowDefinition) -> Result<(), WorkflowError> {
        definition.set_column_mappings(&self.node_id, self.mappings.clone())?;
        self.saved = self.mappings.clone();
        log::info!(
            "Saved {} column mappings on node '{}'",
            self.mappings.len(),
            self.node_id
        );
        Ok(())
    }
}
