use aw_lang::{CmpOp, Expr, FieldPath, PathSegment, RowFilter, Value};

use crate::context::EvalContext;
use crate::eval::walk_value;

// ---------------------------------------------------------------------------
// Row-filter extraction
// ---------------------------------------------------------------------------

/// Derive a storage filter from an allow expression. This is a structural
/// transform over the tree shape — it never evaluates, so it cannot carry
/// side effects.
///
/// Extraction is sound but partial: whatever it cannot encode becomes
/// `Unconstrained` (wider, never narrower), and the access check remains
/// the authority for those rules. Permission checks in particular are
/// ambient — they depend on the user, not the row — and are enforced on
/// the access-check path, never encoded as a possibly-wrong predicate.
pub fn extract_row_filter(expr: &Expr, ctx: &EvalContext) -> RowFilter {
    match expr {
        Expr::Op { name, args } if name == "and" => {
            RowFilter::all(args.iter().map(|a| extract_row_filter(a, ctx)).collect())
        }
        Expr::Op { name, args } if name == "or" => {
            RowFilter::any(args.iter().map(|a| extract_row_filter(a, ctx)).collect())
        }
        Expr::Cond {
            op: CmpOp::Eq,
            left,
            right: Some(right),
        } => extract_eq(left, right, ctx),
        _ => RowFilter::Unconstrained,
    }
}

/// What a field path addresses from the extractor's point of view.
enum PathKind<'a> {
    /// A plain column of the candidate record.
    Record(&'a FieldPath),
    /// A `user.`-rooted path, resolvable against the context ahead of the
    /// query.
    User(&'a FieldPath),
    /// Anything extraction does not reason about (wildcards, other roots).
    Opaque,
}

fn classify(path: &FieldPath) -> PathKind<'_> {
    if path.ends_with_wildcard() {
        return PathKind::Opaque;
    }
    let segments = path.segments();
    if segments.len() > 1
        && let Some(PathSegment::Key(root)) = segments.first()
    {
        match root.as_str() {
            "user" => return PathKind::User(path),
            "params" | "globals" => return PathKind::Opaque,
            _ => {}
        }
    }
    PathKind::Record(path)
}

fn extract_eq(left: &Expr, right: &Expr, ctx: &EvalContext) -> RowFilter {
    match (left, right) {
        (Expr::Field { path: a }, Expr::Field { path: b }) => {
            match (classify(a), classify(b)) {
                (PathKind::Record(field), PathKind::User(user_path)) => {
                    resolve_user_leaf(field, user_path, ctx)
                }
                (PathKind::User(user_path), PathKind::Record(field)) => {
                    resolve_user_leaf(field, user_path, ctx)
                }
                _ => RowFilter::Unconstrained,
            }
        }
        (Expr::Field { path }, Expr::Literal { value })
        | (Expr::Literal { value }, Expr::Field { path }) => match classify(path) {
            PathKind::Record(field) => RowFilter::eq(field.to_string(), value.clone()),
            _ => RowFilter::Unconstrained,
        },
        _ => RowFilter::Unconstrained,
    }
}

/// Resolve the `user.` side against the context and emit a concrete leaf
/// for the record side. An unauthenticated user resolves to null, which is
/// exactly what evaluation would compare against — not a widening.
fn resolve_user_leaf(field: &FieldPath, user_path: &FieldPath, ctx: &EvalContext) -> RowFilter {
    let tail_segments = user_path.segments()[1..].to_vec();
    let Ok(tail) = FieldPath::from_segments(tail_segments) else {
        return RowFilter::Unconstrained;
    };
    match walk_value(ctx.user_doc(), &tail) {
        Ok(value @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::Str(_))) => {
            RowFilter::eq(field.to_string(), value)
        }
        // Arrays/objects (e.g. user.roles) are not a scalar predicate.
        _ => RowFilter::Unconstrained,
    }
}
