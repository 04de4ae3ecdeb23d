use super::{ColumnMapping, MappingSet};
use crate::db::connectors::ConnectorKind;
use crate::db::schema::{find_column_ci, ColumnDescriptor};
use crate::db::transformer::TransformStep;
use crate::db::type_mapper::suggest_cast;

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Build a mapping set by matching source columns to destination columns by
/// name, ignoring case.
///
/// - A matched entry targets the destination's exact spelling and carries a
///   cast step when [`suggest_cast`] finds the types incompatible.
/// - An unmatched entry passes the source name through with no transforms.
///
/// Output follows source order and nothing is skipped. Calling this again
/// yields the same set; callers replace the previous set with it.
pub fn auto_map(
    source_columns: &[ColumnDescriptor],
    dest_columns: &[ColumnDescriptor],
    source_kind: ConnectorKind,
    dest_kind: ConnectorKind,
) -> MappingSet {
    source_columns
        .iter()
        .map(|src| {
            let dest_match = find_column_ci(dest_columns, &src.name);

            let cast_to = dest_match.and_then(|dst| {
                suggest_cast(&src.native_type, source_kind, &dst.native_type, dest_kind)
            });

            ColumnMapping {
                source_column: src.name.clone(),
                target_column: dest_match
                    .map(|dst| dst.name.clone())
                    .unwrap_or_else(|| src.name.clone()),
                transforms: cast_to.map(TransformStep::cast).into_iter().collect(),
                skip: false,
                source_type: non_empty(&src.native_type),
                target_type: dest_match.and_then(|dst| non_empty(&dst.native_type)),
            }
        })
        .collect()
}

/// Map every source column onto itself with no casts, for nodes without a
/// known destination schema.
pub fn identity_map(source_columns: &[ColumnDescriptor]) -> MappingSet {
    source_columns
        .iter()
        .map(|src| ColumnMapping {
            source_type: non_empty(&src.native_type),
            ..ColumnMapping::passthrough(src.name.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::type_mapper::CanonicalType;

    fn cols(pairs: &[(&str, &str)]) -> Vec<ColumnDescriptor> {
        pairs.iter().map(|(n, t)| ColumnDescriptor::new(*n, *t)).collect()
    }

    #[test]
    fn test_case_insensitive_match_uses_dest_spelling() {
        let src = cols(&[("id", "int"), ("amt", "decimal")]);
        let dst = cols(&[("ID", "int64")]);
        let set = auto_map(&src, &dst, ConnectorKind::Relational, ConnectorKind::Columnar);

        assert_eq!(set.len(), 2);
        let first = set.get(0).unwrap();
        assert_eq!(first.source_column, "id");
        assert_eq!(first.target_column, "ID");
        assert!(first.transforms.is_empty());
        assert_eq!(first.target_type.as_deref(), Some("int64"));

        let second = set.get(1).unwrap();
        assert_eq!(second.target_column, "amt");
        assert!(second.transforms.is_empty());
        assert_eq!(second.target_type, None);
    }

    #[test]
    fn test_incompatible_types_get_cast() {
        let src = cols(&[("code", "varchar")]);
        let dst = cols(&[("code", "INT64")]);
        let set = auto_map(&src, &dst, ConnectorKind::Relational, ConnectorKind::Columnar);
        assert_eq!(
            set.get(0).unwrap().transforms,
            vec![TransformStep::cast(CanonicalType::Integer)]
        );
    }

    #[test]
    fn test_unknown_source_type_gets_no_cast() {
        let src = cols(&[("geo", "geography"), ("blank", "")]);
        let dst = cols(&[("geo", "string"), ("blank", "string")]);
        let set = auto_map(&src, &dst, ConnectorKind::Relational, ConnectorKind::Columnar);
        assert!(set.iter().all(|m| m.transforms.is_empty()));
        assert_eq!(set.get(1).unwrap().source_type, None);
    }

    #[test]
    fn test_auto_map_is_idempotent() {
        let src = cols(&[("a", "bit"), ("B", "datetime"), ("c", "nvarchar")]);
        let dst = cols(&[("A", "bool"), ("b", "date")]);
        let first = auto_map(&src, &dst, ConnectorKind::Relational, ConnectorKind::Columnar);
        let second = auto_map(&src, &dst, ConnectorKind::Relational, ConnectorKind::Columnar);
        assert_eq!(first, second);
        assert!(first.iter().all(|m| !m.skip));
    }

    #[test]
    fn test_identity_map() {
        let src = cols(&[("x", "int"), ("y", "varchar")]);
        let set = identity_map(&src);
        assert_eq!(set.len(), 2);
        for (entry, col) in set.iter().zip(&src) {
            assert_eq!(entry.source_column, col.name);
            assert_eq!(entry.target_column, col.name);
            assert!(entry.transforms.is_empty());
            assert_eq!(entry.source_type.as_deref(), Some(col.native_type.as_str()));
        }
    }
}
