use std::collections::HashMap;
use std::sync::Arc;

use aw_lang::Value;
use chrono::{DateTime, TimeZone, Utc};

use super::{OpEntry, expect_arity, number_arg};
use crate::error::EvalError;

// Date operations are pure over their arguments; there is no `now`. A rule
// that needs the current instant receives it through `globals`, so repeated
// evaluations of the same inputs stay identical.

pub(super) fn register(ops: &mut HashMap<String, OpEntry>) {
    ops.insert("dateBefore".to_string(), OpEntry::Pure(Arc::new(date_before)));
    ops.insert("dateAfter".to_string(), OpEntry::Pure(Arc::new(date_after)));
    ops.insert("daysBetween".to_string(), OpEntry::Pure(Arc::new(days_between)));
    ops.insert("dateAdd".to_string(), OpEntry::Pure(Arc::new(date_add)));
}

/// Accepts an RFC 3339 string or an epoch-milliseconds number.
fn parse_instant(name: &str, args: &[Value], i: usize) -> Result<DateTime<Utc>, EvalError> {
    match args.get(i) {
        Some(Value::Str(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| EvalError::operation(name, format!("invalid RFC 3339 date `{s}`: {e}"))),
        Some(Value::Number(n)) => Utc
            .timestamp_millis_opt(*n as i64)
            .single()
            .ok_or_else(|| EvalError::operation(name, format!("epoch millis {n} out of range"))),
        Some(other) => Err(EvalError::operation(
            name,
            format!(
                "argument {} must be an RFC 3339 string or epoch millis, got {}",
                i + 1,
                other.type_name()
            ),
        )),
        None => Err(EvalError::operation(name, format!("missing argument {}", i + 1))),
    }
}

fn date_before(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("dateBefore", args, 2)?;
    let a = parse_instant("dateBefore", args, 0)?;
    let b = parse_instant("dateBefore", args, 1)?;
    Ok(Value::Bool(a < b))
}

fn date_after(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("dateAfter", args, 2)?;
    let a = parse_instant("dateAfter", args, 0)?;
    let b = parse_instant("dateAfter", args, 1)?;
    Ok(Value::Bool(a > b))
}

/// Signed whole days from the first instant to the second.
fn days_between(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("daysBetween", args, 2)?;
    let a = parse_instant("daysBetween", args, 0)?;
    let b = parse_instant("daysBetween", args, 1)?;
    Ok(Value::Number((b - a).num_days() as f64))
}

/// Add (or with a negative count, subtract) whole days; returns RFC 3339.
fn date_add(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("dateAdd", args, 2)?;
    let date = parse_instant("dateAdd", args, 0)?;
    let days = number_arg("dateAdd", args, 1)?.trunc() as i64;
    let delta = chrono::Duration::try_days(days)
        .ok_or_else(|| EvalError::operation("dateAdd", format!("day count {days} out of range")))?;
    let shifted = date
        .checked_add_signed(delta)
        .ok_or_else(|| EvalError::operation("dateAdd", "resulting date out of range"))?;
    Ok(Value::Str(shifted.to_rfc3339()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_ordering() {
        let early = s("2026-01-01T00:00:00Z");
        let late = s("2026-06-15T12:30:00Z");
        assert_eq!(date_before(&[early.clone(), late.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(date_after(&[early.clone(), late.clone()]).unwrap(), Value::Bool(false));
        assert_eq!(date_after(&[late, early]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_epoch_millis_accepted() {
        // 1970-01-02T00:00:00Z as epoch millis.
        let day_two = Value::Number(86_400_000.0);
        assert_eq!(
            date_before(&[s("1970-01-01T00:00:00Z"), day_two]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_days_between_is_signed() {
        let a = s("2026-01-01T00:00:00Z");
        let b = s("2026-01-11T00:00:00Z");
        assert_eq!(days_between(&[a.clone(), b.clone()]).unwrap(), Value::Number(10.0));
        assert_eq!(days_between(&[b, a]).unwrap(), Value::Number(-10.0));
    }

    #[test]
    fn test_date_add() {
        let out = date_add(&[s("2026-01-01T00:00:00Z"), Value::Number(31.0)]).unwrap();
        match out {
            Value::Str(rendered) => assert!(rendered.starts_with("2026-02-01T00:00:00")),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_date_is_an_error() {
        assert!(date_before(&[s("yesterday"), s("2026-01-01T00:00:00Z")]).is_err());
        assert!(parse_instant("t", &[Value::Bool(true)], 0).is_err());
    }
}
