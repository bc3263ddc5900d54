use aw_lang::Expr;

use crate::error::EvalError;

/// Path segments that could reach interpreter or host internals if a rule
/// were ever replayed against a less careful runtime: prototype-chain
/// accessors, ambient process/global objects, module loaders, and code
/// constructors. Matching is exact and case-sensitive.
pub const DENYLISTED_SEGMENTS: &[&str] = &[
    "__proto__",
    "prototype",
    "constructor",
    "process",
    "global",
    "globalThis",
    "require",
    "module",
    "eval",
    "Function",
    "__dirname",
    "__filename",
];

/// Static security pass, run once per expression before evaluation starts.
/// Any denylisted segment anywhere in the tree is rejected before a single
/// operation runs.
pub fn validate_expr(expr: &Expr) -> Result<(), EvalError> {
    let mut offense: Option<EvalError> = None;
    expr.for_each_path(&mut |path| {
        if offense.is_some() {
            return;
        }
        for key in path.keys() {
            if DENYLISTED_SEGMENTS.contains(&key) {
                offense = Some(EvalError::DenylistedSegment {
                    path: path.to_string(),
                    segment: key.to_string(),
                });
                return;
            }
        }
    });
    match offense {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
