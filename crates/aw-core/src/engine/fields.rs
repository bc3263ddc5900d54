use std::collections::BTreeMap;

use aw_lang::{FieldSpec, Value};

// ---------------------------------------------------------------------------
// Field-level permissions
// ---------------------------------------------------------------------------

/// Allowed field names for one direction (read or write).
///
/// `All { except }` keeps deny effective even when the allowed set cannot
/// be enumerated: a `deny` under `["*"]` lands in `except` instead of being
/// lost.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldList {
    /// Every field except the listed ones.
    All { except: Vec<String> },
    /// Exactly these fields.
    Listed(Vec<String>),
}

impl FieldList {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            FieldList::All { except } => !except.iter().any(|f| f == name),
            FieldList::Listed(fields) => fields.iter().any(|f| f == name),
        }
    }

    /// True when filtering with this list is the identity.
    pub fn passes_everything(&self) -> bool {
        matches!(self, FieldList::All { except } if except.is_empty())
    }
}

/// Resolved read/write field sets for one policy.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSets {
    pub read: FieldList,
    pub write: FieldList,
}

/// Resolve declared field lists. Omitted lists (and `["*"]`) mean every
/// field; `deny` is then removed from both directions — deny always wins,
/// independent of declaration order in the source.
pub fn resolve_field_sets(spec: Option<&FieldSpec>) -> FieldSets {
    let Some(spec) = spec else {
        return FieldSets {
            read: FieldList::All { except: Vec::new() },
            write: FieldList::All { except: Vec::new() },
        };
    };
    FieldSets {
        read: resolve_list(spec.read.as_deref(), &spec.deny),
        write: resolve_list(spec.write.as_deref(), &spec.deny),
    }
}

fn resolve_list(declared: Option<&[String]>, deny: &[String]) -> FieldList {
    match declared {
        None => FieldList::All {
            except: deny.to_vec(),
        },
        Some(list) if list.iter().any(|f| f == "*") => FieldList::All {
            except: deny.to_vec(),
        },
        Some(list) => FieldList::Listed(
            list.iter()
                .filter(|f| !deny.contains(f))
                .cloned()
                .collect(),
        ),
    }
}

/// Project a record onto an allowed field set: a new record holding the
/// intersection of the record's own keys and the allowed names. Fields
/// absent from the source are never synthesized — the last line of defense
/// against extra fields smuggled into a write payload. Non-object values
/// pass through untouched (there are no fields to strip).
pub fn apply_field_filter(data: &Value, allowed: &FieldList) -> Value {
    let Value::Object(map) = data else {
        return data.clone();
    };
    if allowed.passes_everything() {
        return data.clone();
    }
    let kept: BTreeMap<String, Value> = map
        .iter()
        .filter(|(key, _)| allowed.allows(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(kept)
}
