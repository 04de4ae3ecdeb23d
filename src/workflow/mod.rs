//! Workflow definitions: the node graph a column mapping lives in.
//!
//! Node configuration arrives as loosely shaped JSON keyed by the node's
//! `type`. It is decoded here into a [`NodeConfig`] variant per node kind so
//! the rest of the crate works with typed fields.

pub mod session;
pub mod store;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::connectors::ConnectionType;
use crate::db::mapping::MappingSet;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Node '{0}' not found")]
    NodeNotFound(String),
    #[error("Node '{node_id}' ({kind}) has no column mapping")]
    NotMappable { node_id: String, kind: NodeKind },
    #[error("Invalid {kind} config on node '{node_id}': {source}")]
    InvalidConfig {
        node_id: String,
        kind: NodeKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Node types the editor can place
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Source,
    Destination,
    Transform,
    Filter,
    SqlExecute,
    Join,
    #[serde(alias = "workflow_ref")]
    WorkflowRef,
}

impl NodeKind {
    /// Default label for a freshly placed node.
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Source => "Source",
            NodeKind::Destination => "Destination",
            NodeKind::Transform => "Transform",
            NodeKind::Filter => "Filter",
            NodeKind::SqlExecute => "SQL Execute",
            NodeKind::Join => "Join",
            NodeKind::WorkflowRef => "Workflow Ref",
        }
    }

    /// Transform and filter nodes pass rows through unchanged in shape, so an
    /// upstream source search walks through them.
    pub fn is_pass_through(self) -> bool {
        matches!(self, NodeKind::Transform | NodeKind::Filter)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Node configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Custom SQL; overrides `table` when non-blank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u32>,
}

impl SourceConfig {
    /// The custom query, trimmed, when one is set.
    pub fn custom_query(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Append,
    Overwrite,
    Upsert,
}

/// What the backend does when a chunk fails to write
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    Rollback,
    Continue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DestinationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default)]
    pub write_mode: WriteMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upsert_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_mappings: Option<MappingSet>,
    /// Rows per multi-row INSERT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OnError>,
}

impl DestinationConfig {
    /// Column mapping is enabled when the node carries at least one entry.
    pub fn mapping_enabled(&self) -> bool {
        self.column_mappings.as_ref().is_some_and(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransformConfig {
    #[serde(default)]
    pub column_mappings: MappingSet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterConfig {
    /// WHERE-clause style condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SqlExecuteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<ConnectionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// Typed node configuration, one variant per node kind.
///
/// Join and workflow-ref nodes are carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Source(SourceConfig),
    Destination(DestinationConfig),
    Transform(TransformConfig),
    Filter(FilterConfig),
    SqlExecute(SqlExecuteConfig),
    Join(Map<String, Value>),
    WorkflowRef(Map<String, Value>),
}

impl NodeConfig {
    /// Empty configuration for a new node of `kind`.
    pub fn empty(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Source => NodeConfig::Source(SourceConfig::default()),
            NodeKind::Destination => NodeConfig::Destination(DestinationConfig::default()),
            NodeKind::Transform => NodeConfig::Transform(TransformConfig::default()),
            NodeKind::Filter => NodeConfig::Filter(FilterConfig::default()),
            NodeKind::SqlExecute => NodeConfig::SqlExecute(SqlExecuteConfig::default()),
            NodeKind::Join => NodeConfig::Join(Map::new()),
            NodeKind::WorkflowRef => NodeConfig::WorkflowRef(Map::new()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Source(_) => NodeKind::Source,
            NodeConfig::Destination(_) => NodeKind::Destination,
            NodeConfig::Transform(_) => NodeKind::Transform,
            NodeConfig::Filter(_) => NodeKind::Filter,
            NodeConfig::SqlExecute(_) => NodeKind::SqlExecute,
            NodeConfig::Join(_) => NodeKind::Join,
            NodeConfig::WorkflowRef(_) => NodeKind::WorkflowRef,
        }
    }

    /// Decode the raw `config` object of a node of `kind`.
    pub fn decode(kind: NodeKind, raw: Value) -> Result<Self, serde_json::Error> {
        let raw = match raw {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Ok(match kind {
            NodeKind::Source => NodeConfig::Source(serde_json::from_value(raw)?),
            NodeKind::Destination => NodeConfig::Destination(serde_json::from_value(raw)?),
            NodeKind::Transform => NodeConfig::Transform(serde_json::from_value(raw)?),
            NodeKind::Filter => NodeConfig::Filter(serde_json::from_value(raw)?),
            NodeKind::SqlExecute => NodeConfig::SqlExecute(serde_json::from_value(raw)?),
            NodeKind::Join => NodeConfig::Join(serde_json::from_value(raw)?),
            NodeKind::WorkflowRef => NodeConfig::WorkflowRef(serde_json::from_value(raw)?),
        })
    }

    /// Encode back into the raw `config` object.
    pub fn encode(&self) -> Result<Value, serde_json::Error> {
        match self {
            NodeConfig::Source(c) => serde_json::to_value(c),
            NodeConfig::Destination(c) => serde_json::to_value(c),
            NodeConfig::Transform(c) => serde_json::to_value(c),
            NodeConfig::Filter(c) => serde_json::to_value(c),
            NodeConfig::SqlExecute(c) => serde_json::to_value(c),
            NodeConfig::Join(m) | NodeConfig::WorkflowRef(m) => Ok(Value::Object(m.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

/// A node of the workflow graph
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct WorkflowNode {
    pub id: String,
    pub position: Position,
    pub label: String,
    pub description: Option<String>,
    pub disabled: bool,
    pub config: NodeConfig,
    /// Editor-only keys (selection, measured size, ...) kept verbatim
    pub extra: Map<String, Value>,
    /// Unrecognized keys inside `data`, kept verbatim
    pub data_extra: Map<String, Value>,
}

impl WorkflowNode {
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }
}

/// Wire form of a node: `{ id, type, position, data: { label, config, .. } }`
#[derive(Serialize, Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    data: RawNodeData,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Default, Serialize, Deserialize)]
struct RawNodeData {
    #[serde(default)]
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    disabled: bool,
    #[serde(default)]
    config: Value,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawNode> for WorkflowNode {
    type Error = WorkflowError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let config = NodeConfig::decode(raw.kind, raw.data.config).map_err(|source| {
            WorkflowError::InvalidConfig {
                node_id: raw.id.clone(),
                kind: raw.kind,
                source,
            }
        })?;
        Ok(WorkflowNode {
            id: raw.id,
            position: raw.position,
            label: raw.data.label,
            description: raw.data.description,
            disabled: raw.data.disabled,
            config,
            extra: raw.extra,
            data_extra: raw.data.extra,
        })
    }
}

impl TryFrom<WorkflowNode> for RawNode {
    type Error = WorkflowError;

    fn try_from(node: WorkflowNode) -> Result<Self, Self::Error> {
        let kind = node.kind();
        let config = node.config.encode().map_err(|source| WorkflowError::InvalidConfig {
            node_id: node.id.clone(),
            kind,
            source,
        })?;
        Ok(RawNode {
            id: node.id,
            kind,
            position: node.position,
            data: RawNodeData {
                label: node.label,
                description: node.description,
                disabled: node.disabled,
                config,
                extra: node.data_extra,
            },
            extra: node.extra,
        })
    }
}

impl Serialize for WorkflowNode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawNode::try_from(self.clone())
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// `success`, `failure`, or an editor rendering type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowEdge {
    /// Edges taken only when the upstream node fails
    pub fn is_failure_path(&self) -> bool {
        self.edge_type.as_deref() == Some("failure")
    }
}

/// Structural problems found in a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralIssue {
    DuplicateNodeId(String),
    DanglingEdge { edge_id: String, node_id: String },
    SelfLoop(String),
    NoSource,
    NoDestination,
}

impl StructuralIssue {
    /// Warnings leave the workflow runnable; everything else is an error.
    pub fn is_warning(&self) -> bool {
        matches!(self, StructuralIssue::NoSource | StructuralIssue::NoDestination)
    }
}

impl std::fmt::Display for StructuralIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructuralIssue::DuplicateNodeId(id) => write!(f, "Duplicate node id '{}'", id),
            StructuralIssue::DanglingEdge { edge_id, node_id } => {
                write!(f, "Edge '{}' references missing node '{}'", edge_id, node_id)
            }
            StructuralIssue::SelfLoop(edge_id) => write!(f, "Edge '{}' connects a node to itself", edge_id),
            StructuralIssue::NoSource => f.write_str("Workflow has no source node"),
            StructuralIssue::NoDestination => f.write_str("Workflow has no destination node"),
        }
    }
}

/// The full graph stored with a workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl WorkflowDefinition {
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut WorkflowNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Place a new node with an empty config and return its id.
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> String {
        let id = format!("node-{}", uuid::Uuid::new_v4());
        self.nodes.push(WorkflowNode {
            id: id.clone(),
            position,
            label: kind.label().to_string(),
            description: None,
            disabled: false,
            config: NodeConfig::empty(kind),
            extra: Map::new(),
            data_extra: Map::new(),
        });
        id
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<WorkflowNode> {
        let pos = self.nodes.iter().position(|n| n.id == id)?;
        self.edges.retain(|e| e.source != id && e.target != id);
        Some(self.nodes.remove(pos))
    }

    /// Add an edge from `source` to `target` and return its id.
    pub fn connect(&mut self, source: &str, target: &str) -> String {
        let id = format!("e-{}-{}", source, target);
        self.edges.push(WorkflowEdge {
            id: id.clone(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: None,
            target_handle: None,
            edge_type: None,
            label: None,
            extra: Map::new(),
        });
        id
    }

    /// Find the source node feeding `node_id`, walking back through transform
    /// and filter nodes at most `max_depth` hops.
    pub fn find_upstream_source(&self, node_id: &str, max_depth: usize) -> Option<&WorkflowNode> {
        self.find_upstream_source_at(node_id, 0, max_depth)
    }

    fn find_upstream_source_at(
        &self,
        node_id: &str,
        depth: usize,
        max_depth: usize,
    ) -> Option<&WorkflowNode> {
        if depth > max_depth {
            return None;
        }
        let upstream = self.edges.iter().filter(|e| e.target == node_id).map(|e| e.source.as_str());
        for uid in upstream {
            let Some(node) = self.node(uid) else {
                continue;
            };
            if node.kind() == NodeKind::Source {
                return Some(node);
            }
            if node.kind().is_pass_through() {
                if let Some(found) = self.find_upstream_source_at(&node.id, depth + 1, max_depth) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// The mapping set of a destination or transform node.
    pub fn column_mappings(&self, node_id: &str) -> Option<&MappingSet> {
        match &self.node(node_id)?.config {
            NodeConfig::Destination(c) => c.column_mappings.as_ref(),
            NodeConfig::Transform(c) => Some(&c.column_mappings),
            _ => None,
        }
    }

    /// Replace a node's mapping set wholesale. An empty set on a destination
    /// node turns column mapping off.
    pub fn set_column_mappings(&mut self, node_id: &str, set: MappingSet) -> Result<(), WorkflowError> {
        let node = self
            .node_mut(node_id)
            .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))?;
        match &mut node.config {
            NodeConfig::Destination(c) => {
                c.column_mappings = if set.is_empty() { None } else { Some(set) };
                Ok(())
            }
            NodeConfig::Transform(c) => {
                c.column_mappings = set;
                Ok(())
            }
            other => Err(WorkflowError::NotMappable {
                node_id: node_id.to_string(),
                kind: other.kind(),
            }),
        }
    }

    /// Graph problems: duplicate ids, dangling edges and self-loops, plus
    /// warnings when no source or no destination node exists.
    pub fn structural_issues(&self) -> Vec<StructuralIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                issues.push(StructuralIssue::DuplicateNodeId(node.id.clone()));
            }
        }
        for edge in &self.edges {
            for end in [&edge.source, &edge.target] {
                if !seen.contains(end.as_str()) {
                    issues.push(StructuralIssue::DanglingEdge {
                        edge_id: edge.id.clone(),
                        node_id: end.clone(),
                    });
                }
            }
            if edge.source == edge.target {
                issues.push(StructuralIssue::SelfLoop(edge.id.clone()));
            }
        }
        if !self.nodes.iter().any(|n| n.kind() == NodeKind::Source) {
            issues.push(StructuralIssue::NoSource);
        }
        if !self.nodes.iter().any(|n| n.kind() == NodeKind::Destination) {
            issues.push(StructuralIssue::NoDestination);
        }
        issues
    }

    /// Count nodes per kind, for summaries.
    pub fn kind_counts(&self) -> HashMap<NodeKind, usize> {
        let mut counts = HashMap::new();
        for node in &self.nodes {
            *counts.entry(node.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// SHA-256 of the serialized definition, hex encoded.
    pub fn fingerprint(&self) -> Result<String, WorkflowError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
