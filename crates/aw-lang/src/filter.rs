use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Value;

// ---------------------------------------------------------------------------
// RowFilter — storage-facing predicate IR
// ---------------------------------------------------------------------------

/// A predicate tree a storage layer can translate into its native WHERE
/// syntax. Deliberately a strict subset of the rule language: equality
/// leaves and AND/OR combinators only, since ambient checks (roles,
/// permissions) cannot become a row predicate without prior resolution.
///
/// `Unconstrained` means "no additional row constraint" — the access-check
/// path remains the authority for whatever this filter cannot encode.
#[derive(Debug, Clone, PartialEq)]
pub enum RowFilter {
    Unconstrained,
    Eq { field: String, value: Value },
    All(Vec<RowFilter>),
    Any(Vec<RowFilter>),
}

impl RowFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        RowFilter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, RowFilter::Unconstrained)
    }

    /// Conjunction. Unconstrained parts drop out (AND with "everything" is
    /// identity); a single survivor is returned unwrapped.
    pub fn all(parts: Vec<RowFilter>) -> Self {
        let mut kept: Vec<RowFilter> = parts
            .into_iter()
            .filter(|p| !p.is_unconstrained())
            .collect();
        match kept.len() {
            0 => RowFilter::Unconstrained,
            1 => kept.remove(0),
            _ => RowFilter::All(kept),
        }
    }

    /// Disjunction. One unconstrained branch admits every row, so the whole
    /// disjunction widens to Unconstrained — wider is sound, narrower is
    /// not. A single constrained branch is returned unwrapped.
    pub fn any(parts: Vec<RowFilter>) -> Self {
        if parts.iter().any(RowFilter::is_unconstrained) {
            return RowFilter::Unconstrained;
        }
        let mut parts = parts;
        match parts.len() {
            0 => RowFilter::Unconstrained,
            1 => parts.remove(0),
            _ => RowFilter::Any(parts),
        }
    }
}

// Serialized shape is the storage contract: `{}` (no constraint),
// `{field: value}`, `{"AND": [...]}`, `{"OR": [...]}`.
impl Serialize for RowFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowFilter::Unconstrained => serializer.serialize_map(Some(0))?.end(),
            RowFilter::Eq { field, value } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(field, value)?;
                map.end()
            }
            RowFilter::All(parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("AND", parts)?;
                map.end()
            }
            RowFilter::Any(parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("OR", parts)?;
                map.end()
            }
        }
    }
}
