//! Column mappings between a source node and a destination or transform node.
//!
//! A [`MappingSet`] is a plain value. The builder creates one from column
//! metadata, the edit operations return a new set, and the review pass reads
//! one without changing it. Nothing here performs I/O.

pub mod builder;
pub mod edit;
pub mod review;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::transformer::{self, TransformStep};
use super::type_mapper::CanonicalType;

pub use builder::{auto_map, identity_map};
pub use review::{display_types, DisplayTypes, MappingIssue, MappingReport};

/// One source column routed to one target column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_column: String,
    #[serde(default)]
    pub transforms: Vec<TransformStep>,
    #[serde(default)]
    pub skip: bool,
    /// Last known native type of the source column, kept for display when the
    /// live schema is unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// Last known native type of the target column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

impl ColumnMapping {
    /// Pass-through entry: same name on both sides, no transforms.
    pub fn passthrough(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            source_column: column.clone(),
            target_column: column,
            transforms: Vec::new(),
            skip: false,
            source_type: None,
            target_type: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.skip
    }

    pub fn cast_target(&self) -> Option<CanonicalType> {
        transformer::cast_target(&self.transforms)
    }

    pub fn default_value(&self) -> Option<&str> {
        transformer::default_value(&self.transforms)
    }

    pub fn is_dropped(&self) -> bool {
        transformer::is_dropped(&self.transforms)
    }

    /// Number of steps besides cast and default.
    pub fn extra_transform_count(&self) -> usize {
        self.transforms.iter().filter(|s| s.is_extra()).count()
    }

    /// Whether the entry contributes a column to the output.
    pub fn writes_output(&self) -> bool {
        self.is_active() && !self.is_dropped()
    }
}

/// Ordered list of column mappings.
///
/// Order is for display only; the destination write order follows the
/// target column names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MappingSet {
    entries: Vec<ColumnMapping>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ColumnMapping] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ColumnMapping> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnMapping> {
        self.entries.iter()
    }

    /// Entries not marked `skip`.
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|m| m.is_active()).count()
    }

    /// Source column names referenced anywhere in the set.
    pub fn referenced_sources(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|m| m.source_column.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<ColumnMapping> {
        self.entries
    }
}

impl From<Vec<ColumnMapping>> for MappingSet {
    fn from(entries: Vec<ColumnMapping>) -> Self {
        Self { entries }
    }
}

impl FromIterator<ColumnMapping> for MappingSet {
    fn from_iter<I: IntoIterator<Item = ColumnMapping>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MappingSet {
    type Item = ColumnMapping;
    type IntoIter = std::vec::IntoIter<ColumnMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a MappingSet {
    type Item = &'a ColumnMapping;
    type IntoIter = std::slice::Iter<'a, ColumnMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Shallow patch for a single entry; `None` fields are left as they are
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MappingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Vec<TransformStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

impl MappingPatch {
    pub fn skip(skip: bool) -> Self {
        Self {
            skip: Some(skip),
            ..Default::default()
        }
    }

    pub fn source_column(name: impl Into<String>) -> Self {
        Self {
            source_column: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn target_column(name: impl Into<String>) -> Self {
        Self {
            target_column: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn transforms(steps: Vec<TransformStep>) -> Self {
        Self {
            transforms: Some(steps),
            ..Default::default()
        }
    }

    fn apply_to(self, entry: &mut ColumnMapping) {
        if let Some(v) = self.source_column {
            entry.source_column = v;
        }
        if let Some(v) = self.target_column {
            entry.target_column = v;
        }
        if let Some(v) = self.transforms {
            entry.transforms = transformer::dedupe_unique_steps(&v);
        }
        if let Some(v) = self.skip {
            entry.skip = v;
        }
        if let Some(v) = self.source_type {
            entry.source_type = Some(v);
        }
        if let Some(v) = self.target_type {
            entry.target_type = Some(v);
        }
    }
}

/// Entries targeted by a bulk operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Indices(BTreeSet<usize>),
}

impl Selection {
    pub fn none() -> Self {
        Selection::Indices(BTreeSet::new())
    }

    pub fn indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        Selection::Indices(indices.into_iter().collect())
    }

    pub fn contains(&self, index: usize) -> bool {
        match self {
            Selection::All => true,
            Selection::Indices(set) => set.contains(&index),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Indices(set) if set.is_empty())
    }

    /// Selection after the row at `removed` was deleted: the removed index
    /// leaves the selection and later indices shift down by one.
    pub fn after_removal(&self, removed: usize) -> Selection {
        match self {
            Selection::All => Selection::All,
            Selection::Indices(set) => Selection::Indices(
                set.iter()
                    .filter(|&&i| i != removed)
                    .map(|&i| if i > removed { i - 1 } else { i })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_wire_defaults() {
        let parsed: ColumnMapping =
            serde_json::from_value(json!({"source_column": "a", "target_column": "b"})).unwrap();
        assert!(parsed.transforms.is_empty());
        assert!(!parsed.skip);
        assert_eq!(parsed.source_type, None);
    }

    #[test]
    fn test_set_is_plain_array() {
        let set = MappingSet::from(vec![ColumnMapping::passthrough("id")]);
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(
            value,
            json!([{"source_column": "id", "target_column": "id", "transforms": [], "skip": false}])
        );
    }

    #[test]
    fn test_counts() {
        let mut dropped = ColumnMapping::passthrough("c");
        dropped.transforms = vec![TransformStep::Drop, TransformStep::cast(CanonicalType::Float)];
        let mut skipped = ColumnMapping::passthrough("b");
        skipped.skip = true;
        let set = MappingSet::from(vec![ColumnMapping::passthrough("a"), skipped, dropped]);

        assert_eq!(set.active_count(), 2);
        assert_eq!(set.get(2).map(|m| m.extra_transform_count()), Some(1));
        assert!(!set.get(2).unwrap().writes_output());
    }

    #[test]
    fn test_selection_after_removal() {
        let sel = Selection::indices([0, 2, 3]);
        assert_eq!(sel.after_removal(2), Selection::indices([0, 2]));
        assert_eq!(sel.after_removal(5), sel);
        assert_eq!(Selection::All.after_removal(0), Selection::All);
        assert!(Selection::none().is_empty());
        assert!(!Selection::All.is_empty());
    }
}
