//! End-to-end checks of the mapping resolver through the public API:
//! normalization, cast suggestion, auto-mapping, edits and the JSON shape
//! stored in a node's configuration.

use flowmap_lib::db::connectors::ConnectorKind;
use flowmap_lib::db::mapping::{auto_map, ColumnMapping, MappingSet, Selection};
use flowmap_lib::db::schema::ColumnDescriptor;
use flowmap_lib::db::transformer::TransformStep;
use flowmap_lib::db::type_mapper::{
    normalize, suggest_cast, CanonicalType, COLUMNAR_SYNONYMS, RELATIONAL_SYNONYMS,
};
use serde_json::json;

// ─── helpers ───────────────────────────────────────────────────────────────

fn cols(pairs: &[(&str, &str)]) -> Vec<ColumnDescriptor> {
    pairs.iter().map(|(n, t)| ColumnDescriptor::new(*n, *t)).collect()
}

fn cast_steps(entry: &ColumnMapping) -> usize {
    entry
        .transforms
        .iter()
        .filter(|s| matches!(s, TransformStep::Cast { .. }))
        .count()
}

// ─── normalization ─────────────────────────────────────────────────────────

#[test]
fn synonyms_normalize_in_any_case_and_padding() {
    let tables = [
        (ConnectorKind::Relational, RELATIONAL_SYNONYMS),
        (ConnectorKind::Columnar, COLUMNAR_SYNONYMS),
    ];
    for (kind, table) in tables {
        for (native, canonical) in table {
            assert_eq!(normalize(native, kind), Some(*canonical), "{} on {}", native, kind);
            let padded = format!("  {}\t", native.to_uppercase());
            assert_eq!(normalize(&padded, kind), Some(*canonical), "{:?} on {}", padded, kind);
        }
    }
}

#[test]
fn unrecognized_types_normalize_to_none() {
    for native in ["", "   ", "geography", "varchar(50)", "xml", "int 64", "🙂"] {
        assert_eq!(normalize(native, ConnectorKind::Relational), None);
        assert_eq!(normalize(native, ConnectorKind::Columnar), None);
    }
}

// ─── cast suggestion ───────────────────────────────────────────────────────

#[test]
fn same_type_same_connector_never_casts() {
    for (native, _) in RELATIONAL_SYNONYMS {
        assert_eq!(
            suggest_cast(native, ConnectorKind::Relational, native, ConnectorKind::Relational),
            None
        );
    }
    for (native, _) in COLUMNAR_SYNONYMS {
        assert_eq!(
            suggest_cast(native, ConnectorKind::Columnar, native, ConnectorKind::Columnar),
            None
        );
    }
}

#[test]
fn cross_connector_suggestions() {
    assert_eq!(
        suggest_cast("int", ConnectorKind::Relational, "int64", ConnectorKind::Columnar),
        None
    );
    assert_eq!(
        suggest_cast("varchar", ConnectorKind::Relational, "int64", ConnectorKind::Columnar),
        Some(CanonicalType::Integer)
    );
    assert_eq!(
        suggest_cast("geography", ConnectorKind::Relational, "string", ConnectorKind::Columnar),
        None
    );
}

// ─── auto-map ──────────────────────────────────────────────────────────────

#[test]
fn auto_map_matches_by_name_and_passes_through_the_rest() {
    let source = cols(&[("id", "int"), ("amt", "decimal")]);
    let dest = cols(&[("ID", "int64")]);
    let set = auto_map(&source, &dest, ConnectorKind::Relational, ConnectorKind::Columnar);

    assert_eq!(set.len(), 2);
    let id = set.get(0).unwrap();
    assert_eq!((id.source_column.as_str(), id.target_column.as_str()), ("id", "ID"));
    assert!(id.transforms.is_empty());
    assert!(!id.skip);

    let amt = set.get(1).unwrap();
    assert_eq!((amt.source_column.as_str(), amt.target_column.as_str()), ("amt", "amt"));
    assert!(amt.transforms.is_empty());
}

#[test]
fn auto_map_is_idempotent() {
    let source = cols(&[("id", "int"), ("name", "nvarchar"), ("paid", "bit")]);
    let dest = cols(&[("ID", "string"), ("Paid", "bool")]);
    let first = auto_map(&source, &dest, ConnectorKind::Relational, ConnectorKind::Columnar);
    let second = auto_map(&source, &dest, ConnectorKind::Relational, ConnectorKind::Columnar);
    assert_eq!(first, second);
    assert_eq!(first.get(0).unwrap().cast_target(), Some(CanonicalType::String));
}

// ─── edits ─────────────────────────────────────────────────────────────────

#[test]
fn set_cast_twice_leaves_one_step() {
    let set: MappingSet = cols(&[("a", "int")])
        .iter()
        .map(|c| ColumnMapping::passthrough(c.name.clone()))
        .collect();
    let set = set
        .set_cast(0, Some(CanonicalType::Float))
        .set_cast(0, Some(CanonicalType::Boolean));
    let entry = set.get(0).unwrap();
    assert_eq!(cast_steps(entry), 1);
    assert_eq!(entry.cast_target(), Some(CanonicalType::Boolean));
}

#[test]
fn bulk_skip_touches_only_selected_flags() {
    let source = cols(&[("a", "int"), ("b", "varchar"), ("c", "bit"), ("d", "date")]);
    let dest = cols(&[("A", "string"), ("B", "string"), ("C", "bool"), ("D", "date")]);
    let before = auto_map(&source, &dest, ConnectorKind::Relational, ConnectorKind::Columnar);
    let after = before.clone().bulk_set_skip(&Selection::indices([0, 2]), true);

    for (i, (old, new)) in before.iter().zip(after.iter()).enumerate() {
        assert_eq!(new.skip, i == 0 || i == 2);
        assert_eq!(
            ColumnMapping { skip: old.skip, ..new.clone() },
            old.clone(),
            "entry {} changed beyond skip",
            i
        );
    }
}

#[test]
fn remove_then_add_keeps_relative_order() {
    let source = cols(&[("a", "int"), ("b", "int"), ("c", "int"), ("d", "int")]);
    let set = auto_map(&source, &[], ConnectorKind::Relational, ConnectorKind::Relational)
        .remove_entry(2)
        .add_entry(&source);
    let names: Vec<&str> = set.iter().map(|m| m.source_column.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "d", "c"]);
}

// ─── wire shape ────────────────────────────────────────────────────────────

#[test]
fn mapping_array_round_trips() {
    let stored = json!([
        {"source_column": "id", "target_column": "ID", "transforms": [{"type": "cast", "cast_to": "integer"}],
         "skip": false, "source_type": "int", "target_type": "INT64"},
        {"source_column": "note", "target_column": "note", "transforms": [
            {"type": "rename", "target_name": "memo"},
            {"type": "default", "default_value": "n/a"},
            {"type": "expression", "expression": "UPPER(note)"},
            {"type": "drop"}
        ], "skip": true}
    ]);

    let set: MappingSet = serde_json::from_value(stored.clone()).unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.get(1).unwrap().is_dropped());
    assert_eq!(serde_json::to_value(&set).unwrap(), stored);

    let reparsed: MappingSet = serde_json::from_value(serde_json::to_value(&set).unwrap()).unwrap();
    assert_eq!(reparsed, set);
}

#[test]
fn sparse_entries_fill_defaults() {
    let set: MappingSet = serde_json::from_value(json!([
        {"source_column": "a", "target_column": "b"},
        {"source_column": "c", "target_column": "d", "transforms": [{"type": "cast"}, {"type": "rename"}]}
    ]))
    .unwrap();
    let first = set.get(0).unwrap();
    assert!(first.transforms.is_empty());
    assert!(!first.skip);
    assert_eq!(first.source_type, None);
    assert_eq!(set.get(1).unwrap().cast_target(), None);
}
