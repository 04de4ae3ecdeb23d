use serde::{Deserialize, Serialize};

use super::type_mapper::CanonicalType;

/// A per-column transform step attached to a mapping entry.
///
/// Payload fields are optional on the wire: a step can be added in the
/// editor before its value is filled in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransformStep {
    Rename {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_name: Option<String>,
    },
    Cast {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cast_to: Option<CanonicalType>,
    },
    Default {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<String>,
    },
    Expression {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expression: Option<String>,
    },
    /// Excludes the column from output; later steps have no effect
    Drop,
}

/// Discriminant of a [`TransformStep`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Rename,
    Cast,
    Default,
    Expression,
    Drop,
}

impl TransformStep {
    pub fn kind(&self) -> TransformKind {
        match self {
            TransformStep::Rename { .. } => TransformKind::Rename,
            TransformStep::Cast { .. } => TransformKind::Cast,
            TransformStep::Default { .. } => TransformKind::Default,
            TransformStep::Expression { .. } => TransformKind::Expression,
            TransformStep::Drop => TransformKind::Drop,
        }
    }

    /// An empty step of the given kind, as the editor creates it.
    pub fn blank(kind: TransformKind) -> Self {
        match kind {
            TransformKind::Rename => TransformStep::Rename { target_name: None },
            TransformKind::Cast => TransformStep::Cast { cast_to: None },
            TransformKind::Default => TransformStep::Default { default_value: None },
            TransformKind::Expression => TransformStep::Expression { expression: None },
            TransformKind::Drop => TransformStep::Drop,
        }
    }

    pub fn cast(to: CanonicalType) -> Self {
        TransformStep::Cast { cast_to: Some(to) }
    }

    pub fn default_value(value: impl Into<String>) -> Self {
        TransformStep::Default {
            default_value: Some(value.into()),
        }
    }

    pub fn rename(target_name: impl Into<String>) -> Self {
        TransformStep::Rename {
            target_name: Some(target_name.into()),
        }
    }

    pub fn expression(expression: impl Into<String>) -> Self {
        TransformStep::Expression {
            expression: Some(expression.into()),
        }
    }

    /// Cast and default steps are edited through dedicated columns and are
    /// unique per entry; everything else is an "extra" step.
    pub fn is_extra(&self) -> bool {
        !matches!(self, TransformStep::Cast { .. } | TransformStep::Default { .. })
    }
}

// ---------------------------------------------------------------------------
// Step list helpers
// ---------------------------------------------------------------------------

/// The cast target of the first cast step, if any.
pub fn cast_target(steps: &[TransformStep]) -> Option<CanonicalType> {
    steps.iter().find_map(|s| match s {
        TransformStep::Cast { cast_to } => Some(*cast_to),
        _ => None,
    })?
}

/// The value of the first default step, if any.
pub fn default_value(steps: &[TransformStep]) -> Option<&str> {
    steps.iter().find_map(|s| match s {
        TransformStep::Default { default_value } => Some(default_value.as_deref()),
        _ => None,
    })?
}

/// Drop every cast step, then append one for `cast_to` when given.
pub fn with_cast(steps: &[TransformStep], cast_to: Option<CanonicalType>) -> Vec<TransformStep> {
    let mut out: Vec<TransformStep> = steps
        .iter()
        .filter(|s| s.kind() != TransformKind::Cast)
        .cloned()
        .collect();
    if let Some(to) = cast_to {
        out.push(TransformStep::cast(to));
    }
    out
}

/// Drop every default step, then append one for `value` when it is given and
/// non-empty.
pub fn with_default(steps: &[TransformStep], value: Option<&str>) -> Vec<TransformStep> {
    let mut out: Vec<TransformStep> = steps
        .iter()
        .filter(|s| s.kind() != TransformKind::Default)
        .cloned()
        .collect();
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        out.push(TransformStep::default_value(v));
    }
    out
}

/// Steps other than cast and default, in order.
pub fn extra_steps(steps: &[TransformStep]) -> Vec<TransformStep> {
    steps.iter().filter(|s| s.is_extra()).cloned().collect()
}

/// Keep cast and default steps, replace all other steps with `extras`.
///
/// Cast/default steps inside `extras` are discarded so the one-per-entry
/// invariant survives edits made through the extra-step editor.
pub fn replace_extra_steps(steps: &[TransformStep], extras: &[TransformStep]) -> Vec<TransformStep> {
    steps
        .iter()
        .filter(|s| !s.is_extra())
        .chain(extras.iter().filter(|s| s.is_extra()))
        .cloned()
        .collect()
}

/// Keep the other steps in order, then append only the last cast step and
/// the last default step.
pub fn dedupe_unique_steps(steps: &[TransformStep]) -> Vec<TransformStep> {
    let last_of = |kind: TransformKind| steps.iter().rev().find(|s| s.kind() == kind).cloned();
    let mut out = extra_steps(steps);
    out.extend(last_of(TransformKind::Cast));
    out.extend(last_of(TransformKind::Default));
    out
}

/// Whether the column is excluded from output.
pub fn is_dropped(steps: &[TransformStep]) -> bool {
    steps.iter().any(|s| matches!(s, TransformStep::Drop))
}

/// Append a blank rename step.
pub fn push_step(steps: &[TransformStep]) -> Vec<TransformStep> {
    let mut out = steps.to_vec();
    out.push(TransformStep::blank(TransformKind::Rename));
    out
}

/// Replace the step at `index`. Out-of-range indices leave the list unchanged.
pub fn update_step(steps: &[TransformStep], index: usize, step: TransformStep) -> Vec<TransformStep> {
    let mut out = steps.to_vec();
    if let Some(slot) = out.get_mut(index) {
        *slot = step;
    }
    out
}

/// Remove the step at `index`. Out-of-range indices leave the list unchanged.
pub fn remove_step(steps: &[TransformStep], index: usize) -> Vec<TransformStep> {
    let mut out = steps.to_vec();
    if index < out.len() {
        out.remove(index);
    }
    out
}

// ===========================================================================
// Tests
// ===========================================================================
