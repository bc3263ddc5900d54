use aw_lang::{Expr, FieldPath, PathSegment, Value};

use crate::context::EvalContext;
use crate::error::EvalError;
use crate::ops::{OpEntry, OpRegistry};
use crate::sandbox::BudgetGuard;

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Depth ceiling applied when no budget is configured.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Recursive tree-walking interpreter: `evaluate(expr, context) -> value`.
///
/// The depth counter is plain mutable state, so the discipline is one
/// evaluator per evaluation call (or per worker thread) — never a shared
/// process-wide instance under concurrency. The sandbox constructs one per
/// call and attaches a budget guard.
pub struct Evaluator<'r> {
    registry: &'r OpRegistry,
    max_depth: usize,
    depth: usize,
    guard: Option<BudgetGuard<'r>>,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r OpRegistry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
            guard: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn with_guard(mut self, guard: BudgetGuard<'r>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Evaluate an expression against a read-only context.
    ///
    /// On error the depth counter is forcibly reset, so one failed
    /// evaluation cannot corrupt a later call on the same instance.
    pub fn evaluate(&mut self, expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
        let result = self.eval_node(expr, ctx);
        if result.is_err() {
            self.depth = 0;
        }
        result
    }

    fn eval_node(&mut self, expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(EvalError::RecursionExceeded {
                max: self.max_depth,
            });
        }
        let result = self.dispatch(expr, ctx);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal { value } => Ok(value.clone()),

            Expr::Field { path } => resolve_field(path, ctx),

            Expr::Op { name, args } => {
                self.charge(name)?;
                // Arguments are evaluated eagerly, left to right.
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval_node(arg, ctx)?);
                }
                self.invoke(name, &evaluated, ctx)
            }

            Expr::Cond { op, left, right } => {
                self.charge(op.name())?;
                let lv = self.eval_node(left, ctx)?;
                let rv = match right {
                    Some(right) => self.eval_node(right, ctx)?,
                    None => Value::Null,
                };
                self.invoke(op.name(), &[lv, rv], ctx)
            }

            Expr::Perm { check, args } => {
                self.charge(check)?;
                if self.registry.get(check).is_none() {
                    return Err(EvalError::UnknownCheck(check.clone()));
                }
                let values: Vec<Value> =
                    args.iter().map(|a| Value::Str(a.clone())).collect();
                self.invoke(check, &values, ctx)
            }
        }
    }

    fn invoke(&self, name: &str, args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
        match self.registry.get(name) {
            Some(OpEntry::Pure(f)) => f(args),
            Some(OpEntry::Contextual(f)) => f(args, ctx),
            None => Err(EvalError::UnknownOperation(name.to_string())),
        }
    }

    fn charge(&mut self, name: &str) -> Result<(), EvalError> {
        match self.guard.as_mut() {
            Some(guard) => guard.visit(name),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Field resolution
// ---------------------------------------------------------------------------

/// Resolve a field path against the context. A nested path whose first
/// segment is `user`, `params` or `globals` addresses that context member;
/// everything else walks the candidate record. A record column literally
/// named `user` stays reachable as the bare single-segment path.
pub(crate) fn resolve_field(path: &FieldPath, ctx: &EvalContext) -> Result<Value, EvalError> {
    let segments = path.segments();
    if segments.len() > 1
        && let Some(PathSegment::Key(root)) = segments.first()
    {
        let member = match root.as_str() {
            "user" => Some(ctx.user_doc()),
            "params" => Some(ctx.params()),
            "globals" => Some(ctx.globals()),
            _ => None,
        };
        if let Some(member) = member {
            return walk(member, &segments[1..], path);
        }
    }
    walk(ctx.data(), segments, path)
}

/// Walk a full path from an arbitrary root. Used for record-side lookups
/// outside the evaluator (ownership checks, filter resolution).
pub(crate) fn walk_value(root: &Value, path: &FieldPath) -> Result<Value, EvalError> {
    walk(root, path.segments(), path)
}

/// Any null or missing intermediate short-circuits to null — absence is
/// data, not an error. A wildcard requires an array and returns it
/// unconsumed for the enclosing array operation; null short-circuits first,
/// so only a present non-array value is an error.
fn walk(root: &Value, segments: &[PathSegment], full: &FieldPath) -> Result<Value, EvalError> {
    let mut current = root;
    for segment in segments {
        match segment {
            PathSegment::Key(key) => match current {
                Value::Object(map) => match map.get(key) {
                    Some(next) => current = next,
                    None => return Ok(Value::Null),
                },
                _ => return Ok(Value::Null),
            },
            PathSegment::Wildcard => match current {
                Value::Array(_) => return Ok(current.clone()),
                Value::Null => return Ok(Value::Null),
                other => {
                    return Err(EvalError::WildcardOnNonArray {
                        path: full.to_string(),
                        found: other.type_name(),
                    });
                }
            },
        }
    }
    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UserContext;
    use aw_lang::CmpOp;
    use serde_json::json;

    fn ctx() -> EvalContext {
        let data = Value::from(json!({
            "title": "quarterly report",
            "status": "published",
            "views": 41,
            "ownerId": "user-123",
            "meta": { "stars": [3, 4, 5] },
            "user": "a record column named user",
        }));
        EvalContext::new(data).with_user(
            UserContext::authenticated("user-123").with_roles(&["editor"]),
        )
    }

    fn eval(expr: &Expr) -> Result<Value, EvalError> {
        let registry = OpRegistry::builtin();
        let mut evaluator = Evaluator::new(&registry);
        evaluator.evaluate(expr, &ctx())
    }

    fn field(path: &str) -> Expr {
        Expr::field(FieldPath::parse(path).unwrap())
    }

    #[test]
    fn test_literal_and_field() {
        assert_eq!(eval(&Expr::literal(42.0)).unwrap(), Value::Number(42.0));
        assert_eq!(
            eval(&field("status")).unwrap(),
            Value::Str("published".to_string())
        );
    }

    #[test]
    fn test_missing_path_short_circuits_to_null() {
        assert_eq!(eval(&field("missing")).unwrap(), Value::Null);
        assert_eq!(eval(&field("missing.deeper.still")).unwrap(), Value::Null);
        // Walking a key into a scalar is absence too.
        assert_eq!(eval(&field("title.sub")).unwrap(), Value::Null);
    }

    #[test]
    fn test_context_roots() {
        assert_eq!(
            eval(&field("user.id")).unwrap(),
            Value::Str("user-123".to_string())
        );
        // A bare `user` path is a record column, not the context member.
        assert_eq!(
            eval(&field("user")).unwrap(),
            Value::Str("a record column named user".to_string())
        );
    }

    #[test]
    fn test_wildcard_returns_array_unconsumed() {
        assert_eq!(
            eval(&field("meta.stars.*")).unwrap(),
            Value::Array(vec![
                Value::Number(3.0),
                Value::Number(4.0),
                Value::Number(5.0)
            ])
        );
        // Wildcard over an absent field is null, and an array op sees it
        // as empty.
        assert_eq!(eval(&field("meta.missing.*")).unwrap(), Value::Null);
        assert_eq!(
            eval(&Expr::op("count", vec![field("meta.missing.*")])).unwrap(),
            Value::Number(0.0)
        );
    }

    #[test]
    fn test_wildcard_on_non_array_is_an_error() {
        let err = eval(&field("title.*")).unwrap_err();
        match err {
            EvalError::WildcardOnNonArray { path, .. } => assert_eq!(path, "title.*"),
            other => panic!("expected wildcard error, got {:?}", other),
        }
    }

    #[test]
    fn test_condition_uses_registry_comparators() {
        let published = Expr::cond(CmpOp::Eq, field("status"), Expr::literal("published"));
        assert_eq!(eval(&published).unwrap(), Value::Bool(true));

        let popular = Expr::cond(CmpOp::Gte, field("views"), Expr::literal(100.0));
        assert_eq!(eval(&popular).unwrap(), Value::Bool(false));

        let has_status = Expr::exists(field("status"));
        assert_eq!(eval(&has_status).unwrap(), Value::Bool(true));
        let no_ghost = Expr::exists(field("ghost"));
        assert_eq!(eval(&no_ghost).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_operation_arguments_evaluate_left_to_right() {
        let expr = Expr::op(
            "concat",
            vec![field("status"), Expr::literal("-"), field("views")],
        );
        assert_eq!(
            eval(&expr).unwrap(),
            Value::Str("published-41".to_string())
        );
    }

    #[test]
    fn test_unknown_names_are_errors() {
        assert_eq!(
            eval(&Expr::op("frobnicate", vec![])).unwrap_err(),
            EvalError::UnknownOperation("frobnicate".to_string())
        );
        assert_eq!(
            eval(&Expr::perm("canFly", &[])).unwrap_err(),
            EvalError::UnknownCheck("canFly".to_string())
        );
    }

    #[test]
    fn test_permission_node_reaches_contextual_op() {
        assert_eq!(eval(&Expr::perm("hasRole", &["editor"])).unwrap(), Value::Bool(true));
        assert_eq!(eval(&Expr::perm("hasRole", &["admin"])).unwrap(), Value::Bool(false));
        assert_eq!(eval(&Expr::perm("isOwner", &[])).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_depth_ceiling_and_reset() {
        // Build a chain of nested not() calls deeper than the ceiling.
        let mut expr = Expr::literal(true);
        for _ in 0..40 {
            expr = Expr::op("not", vec![expr]);
        }
        let registry = OpRegistry::builtin();
        let mut evaluator = Evaluator::new(&registry).with_max_depth(32);
        let err = evaluator.evaluate(&expr, &ctx()).unwrap_err();
        assert_eq!(err, EvalError::RecursionExceeded { max: 32 });

        // The counter was reset: a shallow expression still evaluates.
        assert_eq!(
            evaluator.evaluate(&Expr::literal(1.0), &ctx()).unwrap(),
            Value::Number(1.0)
        );
    }

    #[test]
    fn test_context_is_never_mutated() {
        let context = ctx();
        let before = context.clone();
        let registry = OpRegistry::builtin();
        let mut evaluator = Evaluator::new(&registry);
        let expr = Expr::op(
            "and",
            vec![
                Expr::perm("hasRole", &["editor"]),
                Expr::cond(CmpOp::Eq, field("ownerId"), field("user.id")),
                Expr::op("includes", vec![field("user.roles"), Expr::literal("editor")]),
            ],
        );
        let _ = evaluator.evaluate(&expr, &context).unwrap();
        assert_eq!(context, before);
    }
}
