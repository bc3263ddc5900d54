use serde::{Deserialize, Serialize};

use crate::ast::path::FieldPath;
use crate::value::Value;

// ---------------------------------------------------------------------------
// Comparators
// ---------------------------------------------------------------------------

/// Comparator of a [`Expr::Cond`] node. Each name resolves to the registry
/// operation of the same name, so a comparison has exactly one
/// implementation whether written as a condition or an operation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    Exists,
}

impl CmpOp {
    pub const ALL: [CmpOp; 8] = [
        CmpOp::Eq,
        CmpOp::Ne,
        CmpOp::Gt,
        CmpOp::Lt,
        CmpOp::Gte,
        CmpOp::Lte,
        CmpOp::In,
        CmpOp::Exists,
    ];

    /// Registry operation name this comparator dispatches to.
    pub fn name(self) -> &'static str {
        match self {
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
            CmpOp::Gt => "gt",
            CmpOp::Lt => "lt",
            CmpOp::Gte => "gte",
            CmpOp::Lte => "lte",
            CmpOp::In => "in",
            CmpOp::Exists => "exists",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A node of the allow-rule language. The set of kinds is closed: the
/// evaluator, the static validator and the row-filter extractor all match
/// exhaustively, so adding a kind is a compiler-checked change in each.
///
/// Trees are immutable once built; depth and arity are bounded by sandbox
/// configuration, not by the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Expr {
    /// A constant value.
    Literal { value: Value },
    /// A field reference resolved against the evaluation context.
    Field { path: FieldPath },
    /// A registry operation over eagerly evaluated arguments.
    Op {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// A comparison. `right` may be omitted for `exists`, in which case it
    /// evaluates as null.
    Cond {
        op: CmpOp,
        left: Box<Expr>,
        #[serde(default)]
        right: Option<Box<Expr>>,
    },
    /// A named permission check, e.g. `hasRole("admin")`. Arguments are
    /// plain strings, not expressions.
    Perm {
        check: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal {
            value: value.into(),
        }
    }

    pub fn field(path: FieldPath) -> Self {
        Expr::Field { path }
    }

    pub fn op(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Op {
            name: name.into(),
            args,
        }
    }

    pub fn cond(op: CmpOp, left: Expr, right: Expr) -> Self {
        Expr::Cond {
            op,
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    pub fn exists(left: Expr) -> Self {
        Expr::Cond {
            op: CmpOp::Exists,
            left: Box::new(left),
            right: None,
        }
    }

    pub fn perm(check: impl Into<String>, args: &[&str]) -> Self {
        Expr::Perm {
            check: check.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Visit every field path in the tree.
    pub fn for_each_path<'a>(&'a self, visit: &mut impl FnMut(&'a FieldPath)) {
        match self {
            Expr::Literal { .. } => {}
            Expr::Field { path } => visit(path),
            Expr::Op { args, .. } => {
                for arg in args {
                    arg.for_each_path(visit);
                }
            }
            Expr::Cond { left, right, .. } => {
                left.for_each_path(visit);
                if let Some(right) = right {
                    right.for_each_path(visit);
                }
            }
            Expr::Perm { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let expr = Expr::op(
            "or",
            vec![
                Expr::cond(
                    CmpOp::Eq,
                    Expr::field(path("isPublic")),
                    Expr::literal(true),
                ),
                Expr::cond(
                    CmpOp::Eq,
                    Expr::field(path("uploadedBy")),
                    Expr::field(path("user.id")),
                ),
                Expr::perm("hasRole", &["admin"]),
            ],
        );
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }

    #[test]
    fn test_tagged_representation() {
        let json = r#"{
            "kind": "cond",
            "op": "eq",
            "left": { "kind": "field", "path": "status" },
            "right": { "kind": "literal", "value": "published" }
        }"#;
        let expr: Expr = serde_json::from_str(json).unwrap();
        assert_eq!(
            expr,
            Expr::cond(
                CmpOp::Eq,
                Expr::field(path("status")),
                Expr::literal("published"),
            )
        );
    }

    #[test]
    fn test_exists_omits_right() {
        let expr: Expr = serde_json::from_str(
            r#"{ "kind": "cond", "op": "exists", "left": { "kind": "field", "path": "deletedAt" } }"#,
        )
        .unwrap();
        match expr {
            Expr::Cond { op, right, .. } => {
                assert_eq!(op, CmpOp::Exists);
                assert!(right.is_none());
            }
            other => panic!("expected cond, got {:?}", other),
        }
    }

    #[test]
    fn test_for_each_path_visits_all() {
        let expr = Expr::op(
            "and",
            vec![
                Expr::cond(CmpOp::Eq, Expr::field(path("a.b")), Expr::literal(1.0)),
                Expr::exists(Expr::field(path("c"))),
            ],
        );
        let mut seen = Vec::new();
        expr.for_each_path(&mut |p| seen.push(p.to_string()));
        assert_eq!(seen, vec!["a.b", "c"]);
    }
}
