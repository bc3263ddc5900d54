use std::collections::HashMap;
use std::sync::Arc;

use aw_lang::Value;

use super::{OpEntry, array_arg, expect_arity, string_arg};
use crate::error::EvalError;

// These are the downstream consumers of the field-path wildcard: the
// wildcard hands over the array unconsumed, and the operation traverses it.
// Null in array position is treated as empty throughout (absence is data).

pub(super) fn register(ops: &mut HashMap<String, OpEntry>) {
    ops.insert("count".to_string(), OpEntry::Pure(Arc::new(count)));
    ops.insert("sum".to_string(), OpEntry::Pure(Arc::new(sum)));
    ops.insert("avg".to_string(), OpEntry::Pure(Arc::new(avg)));
    ops.insert("first".to_string(), OpEntry::Pure(Arc::new(first)));
    ops.insert("last".to_string(), OpEntry::Pure(Arc::new(last)));
    ops.insert("unique".to_string(), OpEntry::Pure(Arc::new(unique)));
    ops.insert("flatten".to_string(), OpEntry::Pure(Arc::new(flatten)));
    ops.insert("includes".to_string(), OpEntry::Pure(Arc::new(includes)));
    ops.insert("pluck".to_string(), OpEntry::Pure(Arc::new(pluck)));
}

fn numbers(name: &str, items: &[Value]) -> Result<Vec<f64>, EvalError> {
    items
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                EvalError::operation(
                    name,
                    format!("array element is a {}, expected numbers", v.type_name()),
                )
            })
        })
        .collect()
}

fn count(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("count", args, 1)?;
    Ok(Value::Number(array_arg("count", args, 0)?.len() as f64))
}

fn sum(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("sum", args, 1)?;
    let nums = numbers("sum", array_arg("sum", args, 0)?)?;
    Ok(Value::Number(nums.iter().sum()))
}

fn avg(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("avg", args, 1)?;
    let nums = numbers("avg", array_arg("avg", args, 0)?)?;
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Number(nums.iter().sum::<f64>() / nums.len() as f64))
}

fn first(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("first", args, 1)?;
    Ok(array_arg("first", args, 0)?.first().cloned().unwrap_or(Value::Null))
}

fn last(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("last", args, 1)?;
    Ok(array_arg("last", args, 0)?.last().cloned().unwrap_or(Value::Null))
}

fn unique(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("unique", args, 1)?;
    let mut out: Vec<Value> = Vec::new();
    for v in array_arg("unique", args, 0)? {
        if !out.iter().any(|seen| seen.loose_eq(v)) {
            out.push(v.clone());
        }
    }
    Ok(Value::Array(out))
}

/// Flatten one level: array elements are spliced, scalars kept.
fn flatten(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("flatten", args, 1)?;
    let mut out: Vec<Value> = Vec::new();
    for v in array_arg("flatten", args, 0)? {
        match v {
            Value::Array(inner) => out.extend(inner.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::Array(out))
}

fn includes(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("includes", args, 2)?;
    let haystack = array_arg("includes", args, 0)?;
    let needle = &args[1];
    Ok(Value::Bool(haystack.iter().any(|v| v.loose_eq(needle))))
}

/// Project a named key out of each element. Elements without the key (or
/// that are not objects) contribute null, keeping positions aligned.
fn pluck(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("pluck", args, 2)?;
    let items = array_arg("pluck", args, 0)?;
    let key = string_arg("pluck", args, 1)?;
    let out = items
        .iter()
        .map(|item| match item {
            Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        })
        .collect();
    Ok(Value::Array(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    fn arr(items: Vec<Value>) -> Value {
        Value::Array(items)
    }

    #[test]
    fn test_aggregates() {
        let xs = arr(vec![n(1.0), n(2.0), n(3.0)]);
        assert_eq!(count(&[xs.clone()]).unwrap(), n(3.0));
        assert_eq!(sum(&[xs.clone()]).unwrap(), n(6.0));
        assert_eq!(avg(&[xs]).unwrap(), n(2.0));
        assert_eq!(avg(&[arr(vec![])]).unwrap(), Value::Null);
    }

    #[test]
    fn test_null_is_the_empty_array() {
        assert_eq!(count(&[Value::Null]).unwrap(), n(0.0));
        assert_eq!(sum(&[Value::Null]).unwrap(), n(0.0));
        assert_eq!(first(&[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_non_numeric_aggregate_is_an_error() {
        assert!(sum(&[arr(vec![n(1.0), Value::Str("x".to_string())])]).is_err());
    }

    #[test]
    fn test_first_last_unique_flatten() {
        let xs = arr(vec![n(1.0), n(2.0), n(1.0)]);
        assert_eq!(first(&[xs.clone()]).unwrap(), n(1.0));
        assert_eq!(last(&[xs.clone()]).unwrap(), n(1.0));
        assert_eq!(unique(&[xs]).unwrap(), arr(vec![n(1.0), n(2.0)]));
        assert_eq!(
            flatten(&[arr(vec![arr(vec![n(1.0)]), n(2.0), arr(vec![n(3.0)])])]).unwrap(),
            arr(vec![n(1.0), n(2.0), n(3.0)])
        );
    }

    #[test]
    fn test_includes() {
        let tags = arr(vec![Value::Str("a".to_string()), Value::Str("b".to_string())]);
        assert_eq!(includes(&[tags.clone(), Value::Str("a".to_string())]).unwrap(), Value::Bool(true));
        assert_eq!(includes(&[tags, Value::Str("z".to_string())]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_pluck_keeps_positions() {
        let mut with_key = BTreeMap::new();
        with_key.insert("price".to_string(), n(10.0));
        let items = arr(vec![Value::Object(with_key), Value::Object(BTreeMap::new()), n(5.0)]);
        assert_eq!(
            pluck(&[items, Value::Str("price".to_string())]).unwrap(),
            arr(vec![n(10.0), Value::Null, Value::Null])
        );
    }
}
