use super::connectors::ConnectorKind;
use serde::{Deserialize, Serialize};

/// Canonical type set shared by every connector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
    Timestamp,
}

impl CanonicalType {
    /// All canonical types in the order the editor lists them.
    pub const ALL: [CanonicalType; 7] = [
        CanonicalType::String,
        CanonicalType::Integer,
        CanonicalType::Float,
        CanonicalType::Boolean,
        CanonicalType::Date,
        CanonicalType::Datetime,
        CanonicalType::Timestamp,
    ];

    /// Wire name, as used in `cast_to`.
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalType::String => "string",
            CanonicalType::Integer => "integer",
            CanonicalType::Float => "float",
            CanonicalType::Boolean => "boolean",
            CanonicalType::Date => "date",
            CanonicalType::Datetime => "datetime",
            CanonicalType::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CanonicalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        CanonicalType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("Unknown canonical type: {}", s))
    }
}

/// Native spellings accepted for the row-oriented relational engine.
pub const RELATIONAL_SYNONYMS: &[(&str, CanonicalType)] = &[
    ("int", CanonicalType::Integer),
    ("bigint", CanonicalType::Integer),
    ("smallint", CanonicalType::Integer),
    ("tinyint", CanonicalType::Integer),
    ("numeric", CanonicalType::Float),
    ("decimal", CanonicalType::Float),
    ("money", CanonicalType::Float),
    ("smallmoney", CanonicalType::Float),
    ("float", CanonicalType::Float),
    ("real", CanonicalType::Float),
    ("char", CanonicalType::String),
    ("varchar", CanonicalType::String),
    ("nchar", CanonicalType::String),
    ("nvarchar", CanonicalType::String),
    ("text", CanonicalType::String),
    ("ntext", CanonicalType::String),
    ("time", CanonicalType::String),
    ("uniqueidentifier", CanonicalType::String),
    ("bit", CanonicalType::Boolean),
    ("date", CanonicalType::Date),
    ("datetime", CanonicalType::Datetime),
    ("datetime2", CanonicalType::Datetime),
    ("smalldatetime", CanonicalType::Datetime),
];

/// Native spellings accepted for the columnar warehouse engine.
pub const COLUMNAR_SYNONYMS: &[(&str, CanonicalType)] = &[
    ("integer", CanonicalType::Integer),
    ("int64", CanonicalType::Integer),
    ("int", CanonicalType::Integer),
    ("smallint", CanonicalType::Integer),
    ("bigint", CanonicalType::Integer),
    ("tinyint", CanonicalType::Integer),
    ("byteint", CanonicalType::Integer),
    ("float", CanonicalType::Float),
    ("float64", CanonicalType::Float),
    ("numeric", CanonicalType::Float),
    ("bignumeric", CanonicalType::Float),
    ("decimal", CanonicalType::Float),
    ("bigdecimal", CanonicalType::Float),
    ("string", CanonicalType::String),
    ("varchar", CanonicalType::String),
    ("char", CanonicalType::String),
    ("bytes", CanonicalType::String),
    ("time", CanonicalType::String),
    ("bool", CanonicalType::Boolean),
    ("boolean", CanonicalType::Boolean),
    ("date", CanonicalType::Date),
    ("datetime", CanonicalType::Datetime),
    ("timestamp", CanonicalType::Datetime),
];

/// Synonym table for a connector kind
pub fn synonyms(kind: ConnectorKind) -> &'static [(&'static str, CanonicalType)] {
    match kind {
        ConnectorKind::Relational => RELATIONAL_SYNONYMS,
        ConnectorKind::Columnar => COLUMNAR_SYNONYMS,
    }
}

/// Map a native type string to the canonical type.
///
/// Matching is exact after trimming and lower-casing; `None` means the type
/// is unknown to this connector and carries no information.
pub fn normalize(native_type: &str, kind: ConnectorKind) -> Option<CanonicalType> {
    let token = native_type.trim().to_lowercase();
    if token.is_empty() {
        return None;
    }
    synonyms(kind)
        .iter()
        .find(|(spelling, _)| *spelling == token)
        .map(|(_, canonical)| *canonical)
}

/// Decide whether a source column needs an explicit cast to fit a destination
/// column. Returns the destination's canonical type when the two sides
/// normalize differently, `None` when they agree or either side is unknown.
///
/// Narrowing conversions (float to integer, string to integer) are suggested
/// like any other cast.
pub fn suggest_cast(
    source_native: &str,
    source_kind: ConnectorKind,
    dest_native: &str,
    dest_kind: ConnectorKind,
) -> Option<CanonicalType> {
    let source = normalize(source_native, source_kind)?;
    let dest = normalize(dest_native, dest_kind)?;
    if source == dest {
        None
    } else {
        Some(dest)
    }
}

/// Loose grouping of native type names used for type badges
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TypeFamily {
    Numeric,
    Temporal,
    Text,
    Boolean,
    Other,
}

const NUMERIC_FRAGMENTS: &[&str] = &[
    "int", "integer", "bigint", "smallint", "tinyint", "float", "decimal", "numeric", "real",
    "money", "smallmoney",
];
const TEMPORAL_FRAGMENTS: &[&str] = &["date", "time", "datetime", "timestamp"];
const TEXT_FRAGMENTS: &[&str] = &["char", "varchar", "nchar", "nvarchar", "text", "ntext", "string"];
const BOOLEAN_FRAGMENTS: &[&str] = &["bit", "bool"];

/// Classify a native type for display, by substring and independent of the
/// connector. Unlike [`normalize`] this never feeds into cast decisions.
pub fn type_family(native_type: &str) -> TypeFamily {
    let lower = native_type.to_lowercase();
    let has_any = |fragments: &[&str]| fragments.iter().any(|f| lower.contains(f));

    if lower.trim().is_empty() {
        TypeFamily::Other
    } else if has_any(NUMERIC_FRAGMENTS) {
        TypeFamily::Numeric
    } else if has_any(TEMPORAL_FRAGMENTS) {
        TypeFamily::Temporal
    } else if has_any(TEXT_FRAGMENTS) {
        TypeFamily::Text
    } else if has_any(BOOLEAN_FRAGMENTS) {
        TypeFamily::Boolean
    } else {
        TypeFamily::Other
    }
}
