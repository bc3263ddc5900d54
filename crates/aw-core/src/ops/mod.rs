mod array;
mod compare;
mod datetime;
mod logic;
mod math;
mod permission;
mod string;

use std::collections::HashMap;
use std::sync::Arc;

use aw_lang::Value;

use crate::context::EvalContext;
use crate::error::EvalError;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub type PureFn = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;
pub type ContextFn = Arc<dyn Fn(&[Value], &EvalContext) -> Result<Value, EvalError> + Send + Sync>;

/// A registered operation. Pure entries see only their evaluated arguments;
/// contextual entries (the permission checks) also see the evaluation
/// context, read-only.
#[derive(Clone)]
pub enum OpEntry {
    Pure(PureFn),
    Contextual(ContextFn),
}

/// Immutable name → operation map, built once. Custom operations produce a
/// merged copy via [`OpRegistry::with_custom`]; the shared default is never
/// mutated, so tenants in one process cannot leak operations into each
/// other's registries.
#[derive(Clone)]
pub struct OpRegistry {
    ops: HashMap<String, OpEntry>,
}

impl std::fmt::Debug for OpRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpRegistry")
            .field("ops", &self.ops.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl OpRegistry {
    /// The builtin surface: logic, comparison, math, string, date, array
    /// and permission operations.
    pub fn builtin() -> Self {
        let mut ops = HashMap::new();
        logic::register(&mut ops);
        compare::register(&mut ops);
        math::register(&mut ops);
        string::register(&mut ops);
        datetime::register(&mut ops);
        array::register(&mut ops);
        permission::register(&mut ops);
        Self { ops }
    }

    pub fn get(&self, name: &str) -> Option<&OpEntry> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Registered names, sorted for stable diagnostics.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ops.keys().cloned().collect();
        names.sort();
        names
    }

    /// A merged copy with the given custom operations added. A name that is
    /// already registered is an error — replacing an existing operation
    /// would silently change semantics engine-wide.
    pub fn with_custom(
        &self,
        custom: impl IntoIterator<Item = (String, OpEntry)>,
    ) -> Result<Self, EvalError> {
        let mut ops = self.ops.clone();
        for (name, entry) in custom {
            if ops.contains_key(&name) {
                return Err(EvalError::DuplicateOperation { name });
            }
            ops.insert(name, entry);
        }
        Ok(Self { ops })
    }
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Shared argument helpers
// ---------------------------------------------------------------------------

pub(crate) fn expect_arity(name: &str, args: &[Value], n: usize) -> Result<(), EvalError> {
    if args.len() != n {
        return Err(EvalError::operation(
            name,
            format!("expected {n} argument(s), got {}", args.len()),
        ));
    }
    Ok(())
}

pub(crate) fn expect_min_arity(name: &str, args: &[Value], n: usize) -> Result<(), EvalError> {
    if args.len() < n {
        return Err(EvalError::operation(
            name,
            format!("expected at least {n} argument(s), got {}", args.len()),
        ));
    }
    Ok(())
}

pub(crate) fn number_arg(name: &str, args: &[Value], i: usize) -> Result<f64, EvalError> {
    match args.get(i) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(EvalError::operation(
            name,
            format!("argument {} must be a number, got {}", i + 1, other.type_name()),
        )),
        None => Err(EvalError::operation(name, format!("missing argument {}", i + 1))),
    }
}

pub(crate) fn string_arg<'a>(
    name: &str,
    args: &'a [Value],
    i: usize,
) -> Result<&'a str, EvalError> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s.as_str()),
        Some(other) => Err(EvalError::operation(
            name,
            format!("argument {} must be a string, got {}", i + 1, other.type_name()),
        )),
        None => Err(EvalError::operation(name, format!("missing argument {}", i + 1))),
    }
}

/// Array argument, with null accepted as the empty array — a wildcard over
/// an absent field is data, not an error.
pub(crate) fn array_arg<'a>(
    name: &str,
    args: &'a [Value],
    i: usize,
) -> Result<&'a [Value], EvalError> {
    match args.get(i) {
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(Value::Null) => Ok(&[]),
        Some(other) => Err(EvalError::operation(
            name,
            format!("argument {} must be an array, got {}", i + 1, other.type_name()),
        )),
        None => Err(EvalError::operation(name, format!("missing argument {}", i + 1))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_surface_is_complete() {
        let registry = OpRegistry::builtin();
        for name in [
            "and", "or", "not", "eq", "ne", "gt", "lt", "gte", "lte", "in", "exists", "add",
            "sub", "mul", "div", "mod", "abs", "min", "max", "round", "floor", "ceil", "concat",
            "lower", "upper", "trim", "length", "startsWith", "endsWith", "contains", "matches",
            "split", "dateBefore", "dateAfter", "daysBetween", "dateAdd", "count", "sum", "avg",
            "first", "last", "unique", "flatten", "includes", "pluck", "hasRole", "hasAnyRole",
            "hasAllRoles", "hasPermission", "isOwner", "isAuthenticated", "isAnonymous",
        ] {
            assert!(registry.contains(name), "missing builtin `{name}`");
        }
    }

    #[test]
    fn test_with_custom_merges_into_a_copy() {
        let base = OpRegistry::builtin();
        let custom: PureFn = Arc::new(|_args| Ok(Value::Bool(true)));
        let merged = base
            .with_custom([("alwaysTrue".to_string(), OpEntry::Pure(custom))])
            .unwrap();
        assert!(merged.contains("alwaysTrue"));
        // The shared default is untouched.
        assert!(!base.contains("alwaysTrue"));
    }

    #[test]
    fn test_with_custom_rejects_collisions() {
        let base = OpRegistry::builtin();
        let custom: PureFn = Arc::new(|_args| Ok(Value::Bool(true)));
        let err = base
            .with_custom([("eq".to_string(), OpEntry::Pure(custom))])
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::DuplicateOperation {
                name: "eq".to_string()
            }
        );
    }
}
