use std::collections::HashMap;
use std::sync::Arc;

use aw_lang::Value;

use super::{OpEntry, expect_arity};
use crate::error::EvalError;

pub(super) fn register(ops: &mut HashMap<String, OpEntry>) {
    ops.insert("and".to_string(), OpEntry::Pure(Arc::new(and)));
    ops.insert("or".to_string(), OpEntry::Pure(Arc::new(or)));
    ops.insert("not".to_string(), OpEntry::Pure(Arc::new(not)));
}

// Arguments are evaluated eagerly before dispatch, so these are plain folds
// over truthiness, not short-circuit forms.

fn and(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args.iter().all(Value::is_truthy)))
}

fn or(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args.iter().any(Value::is_truthy)))
}

fn not(args: &[Value]) -> Result<Value, EvalError> {
    expect_arity("not", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}
