use std::collections::HashMap;
use std::sync::Arc;

use aw_lang::Value;

use super::{OpEntry, expect_arity, expect_min_arity, number_arg};
use crate::error::EvalError;

pub(super) fn register(ops: &mut HashMap<String, OpEntry>) {
    ops.insert("add".to_string(), OpEntry::Pure(Arc::new(|a: &[Value]| binary("add", a, |x, y| Ok(x + y)))));
    ops.insert("sub".to_string(), OpEntry::Pure(Arc::new(|a: &[Value]| binary("sub", a, |x, y| Ok(x - y)))));
    ops.insert("mul".to_string(), OpEntry::Pure(Arc::new(|a: &[Value]| binary("mul", a, |x, y| Ok(x * y)))));
    ops.insert("div".to_string(), OpEntry::Pure(Arc::new(div)));
    ops.insert("mod".to_string(), OpEntry::Pure(Arc::new(modulo)));
    ops.insert("abs".to_string(), OpEntry::Pure(Arc::new(|a: &[Value]| unary("abs", a, f64::abs))));
    ops.insert("round".to_string(), OpEntry::Pure(Arc::new(|a: &[Value]| unary("round", a, f64::round))));
    ops.insert("floor".to_string(), OpEntry::Pure(Arc::new(|a: &[Value]| unary("floor", a, f64::floor))));
    ops.insert("ceil".to_string(), OpEntry::Pure(Arc::new(|a: &[Value]| unary("ceil", a, f64::ceil))));
    ops.insert("min".to_string(), OpEntry::Pure(Arc::new(|a: &[Value]| fold("min", a, f64::min))));
    ops.insert("max".to_string(), OpEntry::Pure(Arc::new(|a: &[Value]| fold("max", a, f64::max))));
}

fn binary(
    name: &str,
    args: &[Value],
    apply: impl Fn(f64, f64) -> Result<f64, EvalError>,
) -> Result<Value, EvalError> {
    expect_arity(name, args, 2)?;
    let x = number_arg(name, args, 0)?;
    let y = number_arg(name, args, 1)?;
    Ok(Value::Number(apply(x, y)?))
}

fn unary(name: &str, args: &[Value], apply: impl Fn(f64) -> f64) -> Result<Value, EvalError> {
    expect_arity(name, args, 1)?;
    Ok(Value::Number(apply(number_arg(name, args, 0)?)))
}

fn div(args: &[Value]) -> Result<Value, EvalError> {
    binary("div", args, |x, y| {
        if y == 0.0 {
            Err(EvalError::operation("div", "division by zero"))
        } else {
            Ok(x / y)
        }
    })
}

fn modulo(args: &[Value]) -> Result<Value, EvalError> {
    binary("mod", args, |x, y| {
        if y == 0.0 {
            Err(EvalError::operation("mod", "division by zero"))
        } else {
            Ok(x % y)
        }
    })
}

fn fold(name: &str, args: &[Value], apply: impl Fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    expect_min_arity(name, args, 1)?;
    let mut acc = number_arg(name, args, 0)?;
    for i in 1..args.len() {
        acc = apply(acc, number_arg(name, args, i)?);
    }
    Ok(Value::Number(acc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(binary("add", &[n(2.0), n(3.0)], |x, y| Ok(x + y)).unwrap(), n(5.0));
        assert_eq!(div(&[n(9.0), n(3.0)]).unwrap(), n(3.0));
        assert_eq!(modulo(&[n(9.0), n(4.0)]).unwrap(), n(1.0));
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert!(div(&[n(1.0), n(0.0)]).is_err());
        assert!(modulo(&[n(1.0), n(0.0)]).is_err());
    }

    #[test]
    fn test_rounding_family() {
        assert_eq!(unary("round", &[n(2.5)], f64::round).unwrap(), n(3.0));
        assert_eq!(unary("floor", &[n(2.9)], f64::floor).unwrap(), n(2.0));
        assert_eq!(unary("ceil", &[n(2.1)], f64::ceil).unwrap(), n(3.0));
        assert_eq!(unary("abs", &[n(-4.0)], f64::abs).unwrap(), n(4.0));
    }

    #[test]
    fn test_min_max_fold_variadic() {
        assert_eq!(fold("min", &[n(3.0), n(1.0), n(2.0)], f64::min).unwrap(), n(1.0));
        assert_eq!(fold("max", &[n(3.0), n(1.0), n(2.0)], f64::max).unwrap(), n(3.0));
        assert!(fold("min", &[], f64::min).is_err());
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        assert!(div(&[n(1.0), Value::Str("2".to_string())]).is_err());
    }
}
