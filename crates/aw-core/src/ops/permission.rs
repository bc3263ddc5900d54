use std::collections::HashMap;
use std::sync::Arc;

use aw_lang::{FieldPath, Value};

use super::{OpEntry, expect_arity, expect_min_arity, string_arg};
use crate::context::EvalContext;
use crate::error::EvalError;
use crate::eval::walk_value;

// Contextual operations: ambient checks against the acting user. These are
// reachable both as Perm nodes and as ordinary Op nodes.

pub(super) fn register(ops: &mut HashMap<String, OpEntry>) {
    ops.insert("hasRole".to_string(), OpEntry::Contextual(Arc::new(has_role)));
    ops.insert("hasAnyRole".to_string(), OpEntry::Contextual(Arc::new(has_any_role)));
    ops.insert("hasAllRoles".to_string(), OpEntry::Contextual(Arc::new(has_all_roles)));
    ops.insert("hasPermission".to_string(), OpEntry::Contextual(Arc::new(has_permission)));
    ops.insert("isOwner".to_string(), OpEntry::Contextual(Arc::new(is_owner)));
    ops.insert("isAuthenticated".to_string(), OpEntry::Contextual(Arc::new(is_authenticated)));
    ops.insert("isAnonymous".to_string(), OpEntry::Contextual(Arc::new(is_anonymous)));
}

fn has_role(args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
    expect_arity("hasRole", args, 1)?;
    let role = string_arg("hasRole", args, 0)?;
    Ok(Value::Bool(ctx.user().has_role(role)))
}

fn has_any_role(args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
    expect_min_arity("hasAnyRole", args, 1)?;
    for i in 0..args.len() {
        if ctx.user().has_role(string_arg("hasAnyRole", args, i)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn has_all_roles(args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
    expect_min_arity("hasAllRoles", args, 1)?;
    for i in 0..args.len() {
        if !ctx.user().has_role(string_arg("hasAllRoles", args, i)?) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn has_permission(args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
    expect_arity("hasPermission", args, 1)?;
    let permission = string_arg("hasPermission", args, 0)?;
    Ok(Value::Bool(ctx.user().has_permission(permission)))
}

/// Does the record belong to the acting user? Compares the record field
/// named by the argument (default `ownerId`, nested paths allowed) against
/// `user.id`. Always false for anonymous users.
fn is_owner(args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
    if args.len() > 1 {
        return Err(EvalError::operation(
            "isOwner",
            format!("expected at most 1 argument, got {}", args.len()),
        ));
    }
    let Some(user_id) = ctx.user().id.as_deref().filter(|id| !id.is_empty()) else {
        return Ok(Value::Bool(false));
    };
    let field = match args.first() {
        Some(_) => string_arg("isOwner", args, 0)?,
        None => "ownerId",
    };
    let path = FieldPath::parse(field)
        .map_err(|e| EvalError::operation("isOwner", format!("bad field path `{field}`: {e}")))?;
    let owner = walk_value(ctx.data(), &path)?;
    Ok(Value::Bool(owner.loose_eq(&Value::Str(user_id.to_string()))))
}

fn is_authenticated(args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
    expect_arity("isAuthenticated", args, 0)?;
    Ok(Value::Bool(ctx.user().is_authenticated()))
}

fn is_anonymous(args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
    expect_arity("isAnonymous", args, 0)?;
    Ok(Value::Bool(!ctx.user().is_authenticated()))
}
