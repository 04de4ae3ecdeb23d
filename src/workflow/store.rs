use std::fs;
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::WorkflowDefinition;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Export serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Export not found: {0}")]
    NotFound(String),
}

/// A workflow written out for sharing or backup.
///
/// `exported_at` is a naive local timestamp, the form the workflow service
/// writes in its own exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub definition: WorkflowDefinition,
    /// Revision of the workflow at export time
    #[serde(default = "first_version")]
    pub version: u32,
    pub exported_at: NaiveDateTime,
}

fn first_version() -> u32 {
    1
}

impl WorkflowExport {
    /// Stamp revision 1 of `definition` for export now.
    pub fn new(name: impl Into<String>, description: Option<String>, definition: WorkflowDefinition) -> Self {
        Self {
            name: name.into(),
            description,
            definition,
            version: first_version(),
            exported_at: Local::now().naive_local(),
        }
    }

    pub fn with_version(self, version: u32) -> Self {
        Self { version, ..self }
    }
}

/// File stem for an export name: the name with alphanumerics, `-` and `_`
/// kept and everything else collapsed to `_`, followed by a short hash of the
/// raw name so names that clean up alike get distinct files.
pub fn export_file_stem(name: &str) -> String {
    let readable: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let readable = if readable.is_empty() { "workflow".to_string() } else { readable };
    let digest = Sha256::digest(name.as_bytes());
    format!("{}-{}", readable, hex::encode(&digest[..4]))
}

/// Keeps workflow exports as JSON files in one directory.
pub struct WorkflowStore {
    exports_dir: PathBuf,
}

impl WorkflowStore {
    pub fn new(exports_dir: PathBuf) -> Self {
        Self { exports_dir }
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.exports_dir)?;
        Ok(())
    }

    fn export_path(&self, name: &str) -> PathBuf {
        self.exports_dir.join(format!("{}.json", export_file_stem(name)))
    }

    /// Write an export, replacing any export with the same name.
    pub fn save_export(&self, export: &WorkflowExport) -> Result<PathBuf, StoreError> {
        self.ensure_dir()?;
        let path = self.export_path(&export.name);
        let json = serde_json::to_string_pretty(export)?;
        fs::write(&path, json)?;
        log::info!("Saved workflow export '{}' to {:?}", export.name, path);
        Ok(path)
    }

    pub fn load_export(&self, name: &str) -> Result<WorkflowExport, StoreError> {
        let path = self.export_path(name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let json = fs::read_to_string(path)?;
        let export: WorkflowExport = serde_json::from_str(&json)?;
        if export.name != name {
            log::warn!("Export file for '{}' holds '{}'", name, export.name);
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(export)
    }

    /// All readable exports, sorted by name.
    pub fn list_exports(&self) -> Result<Vec<WorkflowExport>, StoreError> {
        self.ensure_dir()?;

        let mut exports = Vec::new();
        for entry in fs::read_dir(&self.exports_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = fs::read_to_string(&path)?;
            match serde_json::from_str::<WorkflowExport>(&json) {
                Ok(export) => exports.push(export),
                Err(e) => log::warn!("Skipping unreadable export {:?}: {}", path, e),
            }
        }

        exports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(exports)
    }

    pub fn delete_export(&self, name: &str) -> Result<(), StoreError> {
        let path = self.export_path(name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        log::info!("Deleted workflow export '{}'", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{NodeKind, Position};
    use tempfile::tempdir;

    fn make_export(name: &str) -> WorkflowExport {
        let mut definition = WorkflowDefinition::default();
        let src = definition.add_node(NodeKind::Source, Position::default());
        let dst = definition.add_node(NodeKind::Destination, Position { x: 250.0, y: 0.0 });
        definition.connect(&src, &dst);
        WorkflowExport::new(name, Some("nightly load".to_string()), definition)
    }

    #[test]
    fn test_save_and_load_export() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::new(dir.path().join("exports"));

        let export = make_export("Orders Sync");
        let path = store.save_export(&export).unwrap();
        let file = path.file_name().unwrap().to_str().unwrap();
        assert!(file.starts_with("Orders_Sync-") && file.ends_with(".json"));

        let loaded = store.load_export("Orders Sync").unwrap();
        assert_eq!(loaded, export);
        assert_eq!(loaded.version, 1);
    }

    #[test]
    fn test_reads_service_export() {
        let json = r#"{
            "name": "Legacy",
            "description": null,
            "definition": {"nodes": [], "edges": []},
            "version": 7,
            "exported_at": "2024-03-05T14:22:10.123456"
        }"#;
        let export: WorkflowExport = serde_json::from_str(json).unwrap();
        assert_eq!(export.version, 7);
        assert!(export.description.is_none());
        assert_eq!(export.exported_at.to_string(), "2024-03-05 14:22:10.123456");
    }

    #[test]
    fn test_new_stamps_local_time() {
        let export = make_export("now");
        let drift = export.exported_at - Local::now().naive_local();
        assert!(drift.num_seconds().abs() < 5);
    }

    #[test]
    fn test_load_missing_export() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::new(dir.path().join("exports"));

        match store.load_export("missing") {
            Err(StoreError::NotFound(name)) => assert_eq!(name, "missing"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_list_sorted_and_skips_malformed() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::new(dir.path().join("exports"));

        store.save_export(&make_export("beta")).unwrap();
        store.save_export(&make_export("alpha")).unwrap();
        fs::write(dir.path().join("exports").join("junk.json"), "{}").unwrap();
        fs::write(dir.path().join("exports").join("notes.txt"), "hi").unwrap();

        let names: Vec<String> = store.list_exports().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_list_empty() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::new(dir.path().join("exports"));
        assert!(store.list_exports().unwrap().is_empty());
    }

    #[test]
    fn test_delete_export() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::new(dir.path().join("exports"));

        store.save_export(&make_export("gone")).unwrap();
        store.delete_export("gone").unwrap();
        assert!(store.load_export("gone").is_err());
        assert!(matches!(store.delete_export("gone"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_export_file_stem() {
        assert!(export_file_stem("a/b c").starts_with("a_b_c-"));
        assert!(export_file_stem("  ").starts_with("workflow-"));
        assert_eq!(export_file_stem("load-2024_v1"), export_file_stem("load-2024_v1"));
        assert_eq!(export_file_stem("x").len(), "x-".len() + 8);
        assert_ne!(export_file_stem("a b"), export_file_stem("a_b"));
    }

    #[test]
    fn test_names_that_clean_up_alike_stay_apart() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::new(dir.path().join("exports"));

        store.save_export(&make_export("a b")).unwrap();
        store.save_export(&make_export("a_b")).unwrap();

        assert_eq!(store.load_export("a b").unwrap().name, "a b");
        assert_eq!(store.load_export("a_b").unwrap().name, "a_b");
        assert_eq!(store.list_exports().unwrap().len(), 2);
    }

    #[test]
    fn test_load_rejects_file_holding_other_name() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::new(dir.path().join("exports"));

        let path = store.save_export(&make_export("first")).unwrap();
        let other = make_export("second");
        fs::write(&path, serde_json::to_string(&other).unwrap()).unwrap();

        assert!(matches!(store.load_export("first"), Err(StoreError::NotFound(_))));
    }
}
