use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use aw_lang::Value;

use super::{OpEntry, expect_arity, expect_min_arity};
use crate::error::EvalError;

// The condition node dispatches to these by comparator name, so every
// comparison has exactly one implementation.

pub(super) fn register(ops: &mut HashMap<String, OpEntry>) {
    ops.insert("eq".to_string(), OpEntry::Pure(Arc::new(eq)));
    ops.insert("ne".to_string(), OpEntry::Pure(Arc::new(ne)));
    ops.insert(
        "gt".to_string(),
        OpEntry::Pure(Arc::new(|a: &[Value]| ordered("gt", a, Ordering::is_gt))),
    );
    ops.insert(
        "lt".to_string(),
        OpEntry::Pure(Arc::new(|a: &[Value]| ordered("lt", a, Ordering::is_lt))),
    );
    ops.insert(
        "gte".to_string(),
        OpEntry::Pure(Arc::new(|a: &[Value]| ordered("gte", a, Ordering::is_ge))),
    );
    ops.insert(
        "lte".to_string(),
        OpEntry::Pure(Arc::new(|a: &[Value]| ordered("lte", a, Ordering::is_le))),
    );
    ops.insert("in".to_string(), OpEntry::Pure(Arc::new(is_in)));
    ops.insert("exists".to_string(), OpEntry::Pure(Arc::new(exists)));
}

fn eq(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("eq", args, 2)?;
    Ok(Value::Bool(args[0].loose_eq(&args[1])))
}

fn ne(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("ne", args, 2)?;
    Ok(Value::Bool(!args[0].loose_eq(&args[1])))
}

/// Relational comparison. Incomparable types resolve to false, never to an
/// error — a missing field compared against a number is a non-match.
fn ordered(
    name: &str,
    args: &[Value],
    accept: impl Fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    expect_arity(name, args, 2)?;
    let holds = args[0]
        .partial_cmp_values(&args[1])
        .is_some_and(accept);
    Ok(Value::Bool(holds))
}

/// Membership: needle in array, or substring when both sides are strings.
/// A null haystack (absent field) is a non-match.
fn is_in(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("in", args, 2)?;
    match (&args[0], &args[1]) {
        (needle, Value::Array(haystack)) => {
            Ok(Value::Bool(haystack.iter().any(|v| v.loose_eq(needle))))
        }
        (Value::Str(needle), Value::Str(haystack)) => {
            Ok(Value::Bool(haystack.contains(needle.as_str())))
        }
        (_, Value::Null) => Ok(Value::Bool(false)),
        (_, other) => Err(EvalError::operation(
            "in",
            format!("second argument must be an array or string, got {}", other.type_name()),
        )),
    }
}

/// Non-null check. The optional second argument (a condition's unused
/// right-hand side) is ignored.
fn exists(args: &[Value]) -> Result<Value, EvalError> {
    expect_min_arity("exists", args, 1)?;
    Ok(Value::Bool(!args[0].is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_eq_is_loose_on_numbers() {
        assert_eq!(eq(&[Value::Number(0.1 + 0.2), Value::Number(0.3)]).unwrap(), Value::Bool(true));
        assert_eq!(eq(&[s("a"), s("b")]).unwrap(), Value::Bool(false));
        assert_eq!(ne(&[s("a"), s("b")]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_ordering_comparators() {
        let gt = |a: Value, b: Value| ordered("gt", &[a, b], Ordering::is_gt).unwrap();
        assert_eq!(gt(Value::Number(2.0), Value::Number(1.0)), Value::Bool(true));
        assert_eq!(gt(s("b"), s("a")), Value::Bool(true));
        // Incomparable types are a non-match, not an error.
        assert_eq!(gt(Value::Number(1.0), s("a")), Value::Bool(false));
        assert_eq!(gt(Value::Null, Value::Number(1.0)), Value::Bool(false));
    }

    #[test]
    fn test_in_membership() {
        let roles = Value::Array(vec![s("editor"), s("viewer")]);
        assert_eq!(is_in(&[s("editor"), roles.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(is_in(&[s("admin"), roles]).unwrap(), Value::Bool(false));
        assert_eq!(is_in(&[s("ell"), s("hello")]).unwrap(), Value::Bool(true));
        assert_eq!(is_in(&[s("x"), Value::Null]).unwrap(), Value::Bool(false));
        assert!(is_in(&[s("x"), Value::Number(3.0)]).is_err());
    }

    #[test]
    fn test_exists_checks_null() {
        assert_eq!(exists(&[Value::Number(0.0)]).unwrap(), Value::Bool(true));
        assert_eq!(exists(&[Value::Null]).unwrap(), Value::Bool(false));
        // Condition dispatch passes the unused right side as a second arg.
        assert_eq!(exists(&[s("x"), Value::Null]).unwrap(), Value::Bool(true));
    }
}
