use serde::{Deserialize, Serialize};

/// A column as reported by schema introspection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub max_length: Option<i64>,
    #[serde(default)]
    pub is_primary_key: bool,
}

/// A column reduced to what the mapping resolver needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub native_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
        }
    }
}

impl From<&ColumnInfo> for ColumnDescriptor {
    fn from(info: &ColumnInfo) -> Self {
        Self {
            name: info.name.clone(),
            native_type: info.data_type.clone(),
        }
    }
}

impl From<ColumnInfo> for ColumnDescriptor {
    fn from(info: ColumnInfo) -> Self {
        Self {
            name: info.name,
            native_type: info.data_type,
        }
    }
}

/// Convert an introspection result into descriptors, keeping column order.
pub fn descriptors(columns: &[ColumnInfo]) -> Vec<ColumnDescriptor> {
    columns.iter().map(ColumnDescriptor::from).collect()
}

/// Find a column by name, ignoring case.
pub fn find_column_ci<'a>(
    columns: &'a [ColumnDescriptor],
    name: &str,
) -> Option<&'a ColumnDescriptor> {
    let lower = name.to_lowercase();
    columns.iter().find(|c| c.name.to_lowercase() == lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_info_minimal_json() {
        let json = r#"{"name":"id","data_type":"int"}"#;
        let info: ColumnInfo = serde_json::from_str(json).unwrap();
        assert!(!info.nullable);
        assert!(!info.is_primary_key);
        assert_eq!(info.max_length, None);
    }

    #[test]
    fn test_descriptors_keep_order() {
        let cols = vec![
            ColumnInfo {
                name: "b".into(),
                data_type: "int".into(),
                nullable: false,
                max_length: None,
                is_primary_key: true,
            },
            ColumnInfo {
                name: "a".into(),
                data_type: "varchar".into(),
                nullable: true,
                max_length: Some(50),
                is_primary_key: false,
            },
        ];
        let descs = descriptors(&cols);
        assert_eq!(descs[0], ColumnDescriptor::new("b", "int"));
        assert_eq!(descs[1], ColumnDescriptor::new("a", "varchar"));
    }

    #[test]
    fn test_find_column_ci() {
        let cols = vec![ColumnDescriptor::new("CustomerID", "int")];
        assert!(find_column_ci(&cols, "customerid").is_some());
        assert!(find_column_ci(&cols, "customer_id").is_none());
    }
}
