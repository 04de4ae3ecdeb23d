use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ColumnMapping, MappingSet};
use crate::db::schema::{find_column_ci, ColumnDescriptor};

/// Something worth showing the operator about a mapping set.
///
/// Issues never block editing or saving; the backend validation endpoint has
/// the final word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingIssue {
    EmptyTarget { index: usize },
    DuplicateTarget { target: String, indices: Vec<usize> },
    OrphanedSource { index: usize, column: String },
    DuplicateSource { column: String, indices: Vec<usize> },
}

impl fmt::Display for MappingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingIssue::EmptyTarget { index } => {
                write!(f, "Row {} has no target column", index + 1)
            }
            MappingIssue::DuplicateTarget { target, indices } => {
                write!(f, "Target column '{}' is written by rows {}", target, rows(indices))
            }
            MappingIssue::OrphanedSource { index, column } => {
                write!(f, "Row {} maps '{}', which the source no longer has", index + 1, column)
            }
            MappingIssue::DuplicateSource { column, indices } => {
                write!(f, "Source column '{}' is mapped by rows {}", column, rows(indices))
            }
        }
    }
}

fn rows(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| (i + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of [`MappingSet::review`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingReport {
    pub issues: Vec<MappingIssue>,
    pub active: usize,
    pub total: usize,
}

impl MappingReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Native types shown next to an entry's source and target columns.
/// Empty strings mean no type is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTypes {
    pub source: String,
    pub target: String,
}

/// Resolve the types to display for one entry.
///
/// Source: the live source column, then the cached `source_type`, then a
/// destination column with the same name as the source (same-shaped
/// table-to-table copies). Target: the live destination column named by
/// `target_column`, then the cached `target_type`.
pub fn display_types(
    entry: &ColumnMapping,
    source_columns: &[ColumnDescriptor],
    dest_columns: &[ColumnDescriptor],
) -> DisplayTypes {
    let live_type = |cols: &[ColumnDescriptor], name: &str| {
        find_column_ci(cols, name)
            .map(|c| c.native_type.clone())
            .filter(|t| !t.is_empty())
    };

    let source = source_columns
        .iter()
        .find(|c| c.name == entry.source_column)
        .map(|c| c.native_type.clone())
        .filter(|t| !t.is_empty())
        .or_else(|| entry.source_type.clone().filter(|t| !t.is_empty()))
        .or_else(|| live_type(dest_columns, &entry.source_column))
        .unwrap_or_default();

    let target = live_type(dest_columns, &entry.target_column)
        .or_else(|| entry.target_type.clone().filter(|t| !t.is_empty()))
        .unwrap_or_default();

    DisplayTypes { source, target }
}

impl MappingSet {
    /// Indices of entries whose source column is not among `source_columns`.
    /// Entries with an empty source column are not orphans.
    pub fn orphaned_entries(&self, source_columns: &[ColumnDescriptor]) -> Vec<usize> {
        self.iter()
            .enumerate()
            .filter(|(_, m)| {
                !m.source_column.is_empty()
                    && !source_columns.iter().any(|c| c.name == m.source_column)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Collect issues for display.
    ///
    /// Orphan detection needs the live source schema; pass an empty slice when
    /// it is unavailable and the check is skipped. Skipped and dropped entries
    /// do not write output and are ignored by the target checks.
    pub fn review(&self, source_columns: &[ColumnDescriptor]) -> MappingReport {
        let mut issues = Vec::new();

        let mut targets: BTreeMap<String, (String, Vec<usize>)> = BTreeMap::new();
        let mut sources: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

        for (i, entry) in self.iter().enumerate() {
            if !entry.writes_output() {
                continue;
            }
            let target = entry.target_column.trim();
            if target.is_empty() {
                issues.push(MappingIssue::EmptyTarget { index: i });
            } else {
                targets
                    .entry(target.to_lowercase())
                    .or_insert_with(|| (target.to_string(), Vec::new()))
                    .1
                    .push(i);
            }
            if !entry.source_column.is_empty() {
                sources.entry(entry.source_column.as_str()).or_default().push(i);
            }
        }

        for (_, (target, indices)) in targets {
            if indices.len() > 1 {
                issues.push(MappingIssue::DuplicateTarget { target, indices });
            }
        }
        for (column, indices) in sources {
            if indices.len() > 1 {
                issues.push(MappingIssue::DuplicateSource {
                    column: column.to_string(),
                    indices,
                });
            }
        }

        if !source_columns.is_empty() {
            for index in self.orphaned_entries(source_columns) {
                issues.push(MappingIssue::OrphanedSource {
                    index,
                    column: self.entries[index].source_column.clone(),
                });
            }
        }

        MappingReport {
            issues,
            active: self.active_count(),
            total: self.len(),
        }
    }
}
