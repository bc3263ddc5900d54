use std::collections::HashMap;
use std::sync::Arc;

use aw_lang::Value;

use super::{OpEntry, expect_arity, expect_min_arity, string_arg};
use crate::error::EvalError;

pub(super) fn register(ops: &mut HashMap<String, OpEntry>) {
    ops.insert("concat".to_string(), OpEntry::Pure(Arc::new(concat)));
    ops.insert("lower".to_string(), OpEntry::Pure(Arc::new(lower)));
    ops.insert("upper".to_string(), OpEntry::Pure(Arc::new(upper)));
    ops.insert("trim".to_string(), OpEntry::Pure(Arc::new(trim)));
    ops.insert("length".to_string(), OpEntry::Pure(Arc::new(length)));
    ops.insert("startsWith".to_string(), OpEntry::Pure(Arc::new(starts_with)));
    ops.insert("endsWith".to_string(), OpEntry::Pure(Arc::new(ends_with)));
    ops.insert("contains".to_string(), OpEntry::Pure(Arc::new(contains)));
    ops.insert("matches".to_string(), OpEntry::Pure(Arc::new(matches)));
    ops.insert("split".to_string(), OpEntry::Pure(Arc::new(split)));
}

/// Render a scalar for concatenation. Null disappears; containers have no
/// textual form and are rejected.
fn stringify(name: &str, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Str(s) => Ok(s.clone()),
        other => Err(EvalError::operation(
            name,
            format!("cannot render a {} as text", other.type_name()),
        )),
    }
}

fn concat(args: &[Value]) -> Result<Value, EvalError> {
    expect_min_arity("concat", args, 1)?;
    let mut out = String::new();
    for arg in args {
        out.push_str(&stringify("concat", arg)?);
    }
    Ok(Value::Str(out))
}

fn lower(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("lower", args, 1)?;
    Ok(Value::Str(string_arg("lower", args, 0)?.to_lowercase()))
}

fn upper(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("upper", args, 1)?;
    Ok(Value::Str(string_arg("upper", args, 0)?.to_uppercase()))
}

fn trim(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("trim", args, 1)?;
    Ok(Value::Str(string_arg("trim", args, 0)?.trim().to_string()))
}

/// Length of a string (bytes) or an array (elements).
fn length(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("length", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Number(s.len() as f64)),
        Value::Array(items) => Ok(Value::Number(items.len() as f64)),
        Value::Null => Ok(Value::Number(0.0)),
        other => Err(EvalError::operation(
            "length",
            format!("expected a string or array, got {}", other.type_name()),
        )),
    }
}

fn starts_with(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("startsWith", args, 2)?;
    let text = string_arg("startsWith", args, 0)?;
    let prefix = string_arg("startsWith", args, 1)?;
    Ok(Value::Bool(text.starts_with(prefix)))
}

fn ends_with(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("endsWith", args, 2)?;
    let text = string_arg("endsWith", args, 0)?;
    let suffix = string_arg("endsWith", args, 1)?;
    Ok(Value::Bool(text.ends_with(suffix)))
}

fn contains(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("contains", args, 2)?;
    let haystack = string_arg("contains", args, 0)?;
    let needle = string_arg("contains", args, 1)?;
    Ok(Value::Bool(haystack.contains(needle)))
}

fn matches(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("matches", args, 2)?;
    let text = string_arg("matches", args, 0)?;
    let pattern = string_arg("matches", args, 1)?;
    let re = regex::Regex::new(pattern)
        .map_err(|e| EvalError::operation("matches", format!("invalid regex: {e}")))?;
    Ok(Value::Bool(re.is_match(text)))
}

fn split(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("split", args, 2)?;
    let text = string_arg("split", args, 0)?;
    let sep = string_arg("split", args, 1)?;
    let parts = if sep.is_empty() {
        text.chars().map(|c| Value::Str(c.to_string())).collect()
    } else {
        text.split(sep).map(|s| Value::Str(s.to_string())).collect()
    };
    Ok(Value::Array(parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_concat_renders_scalars() {
        let out = concat(&[s("doc-"), Value::Number(7.0), Value::Null, s("-v"), Value::Bool(true)])
            .unwrap();
        assert_eq!(out, s("doc-7-vtrue"));
        assert!(concat(&[Value::Array(vec![])]).is_err());
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(lower(&[s("AbC")]).unwrap(), s("abc"));
        assert_eq!(upper(&[s("abc")]).unwrap(), s("ABC"));
        assert_eq!(trim(&[s("  x  ")]).unwrap(), s("x"));
        assert!(lower(&[Value::Number(1.0)]).is_err());
    }

    #[test]
    fn test_affix_checks() {
        assert_eq!(starts_with(&[s("failed_login"), s("failed")]).unwrap(), Value::Bool(true));
        assert_eq!(ends_with(&[s("failed_login"), s("login")]).unwrap(), Value::Bool(true));
        assert_eq!(contains(&[s("failed_login"), s("ed_lo")]).unwrap(), Value::Bool(true));
        assert_eq!(contains(&[s("abc"), s("z")]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_matches_compiles_and_rejects() {
        assert_eq!(matches(&[s("doc-123"), s("^doc-\\d+$")]).unwrap(), Value::Bool(true));
        assert_eq!(matches(&[s("other"), s("^doc-\\d+$")]).unwrap(), Value::Bool(false));
        assert!(matches(&[s("x"), s("[unclosed")]).is_err());
    }

    #[test]
    fn test_split_and_length() {
        assert_eq!(
            split(&[s("a,b,,c"), s(",")]).unwrap(),
            Value::Array(vec![s("a"), s("b"), s(""), s("c")])
        );
        assert_eq!(
            split(&[s("ab"), s("")]).unwrap(),
            Value::Array(vec![s("a"), s("b")])
        );
        assert_eq!(length(&[s("abc")]).unwrap(), Value::Number(3.0));
        assert_eq!(length(&[Value::Array(vec![s("a")])]).unwrap(), Value::Number(1.0));
        assert_eq!(length(&[Value::Null]).unwrap(), Value::Number(0.0));
    }
}
