mod validate;

pub use validate::{DENYLISTED_SEGMENTS, validate_expr};

use std::collections::HashSet;
use std::time::{Duration, Instant};

use aw_lang::{Expr, Value};

use crate::context::EvalContext;
use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::ops::OpRegistry;

// ---------------------------------------------------------------------------
// EvaluationBudget
// ---------------------------------------------------------------------------

/// Resource ceilings for one evaluation. Defaults are conservative; a
/// deployment raises them through `[budget]` in `warden.toml`.
#[derive(Debug, Clone)]
pub struct EvaluationBudget {
    /// Maximum expression tree depth.
    pub max_depth: usize,
    /// Maximum operation/condition/permission nodes visited.
    pub max_operations: u64,
    /// Wall-clock ceiling. Checked at each counted node visit, so overage
    /// is detected retroactively — evaluation is not preempted mid-node.
    pub timeout: Duration,
    /// Optional allow-list of operation names. `None` means the full
    /// registry, not nothing.
    pub allowed_operations: Option<HashSet<String>>,
}

impl Default for EvaluationBudget {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_operations: 10_000,
            timeout: Duration::from_millis(100),
            allowed_operations: None,
        }
    }
}

impl EvaluationBudget {
    pub fn from_config(config: &aw_config::BudgetConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_operations: config.max_operations,
            timeout: Duration::from_millis(config.timeout_ms),
            allowed_operations: config
                .allowed_operations
                .as_ref()
                .map(|names| names.iter().cloned().collect()),
        }
    }
}

// ---------------------------------------------------------------------------
// BudgetGuard
// ---------------------------------------------------------------------------

/// Per-evaluation meter. The evaluator calls [`BudgetGuard::visit`] on every
/// operation, condition and permission node (leaves are free).
pub(crate) struct BudgetGuard<'b> {
    max_operations: u64,
    visited: u64,
    started: Instant,
    timeout: Duration,
    allowed: Option<&'b HashSet<String>>,
}

impl<'b> BudgetGuard<'b> {
    fn new(budget: &'b EvaluationBudget) -> Self {
        Self {
            max_operations: budget.max_operations,
            visited: 0,
            started: Instant::now(),
            timeout: budget.timeout,
            allowed: budget.allowed_operations.as_ref(),
        }
    }

    pub(crate) fn visit(&mut self, name: &str) -> Result<(), EvalError> {
        if let Some(allowed) = self.allowed
            && !allowed.contains(name)
        {
            return Err(EvalError::OperationNotAllowed {
                name: name.to_string(),
            });
        }
        self.visited += 1;
        if self.visited > self.max_operations {
            return Err(EvalError::OperationBudget {
                max: self.max_operations,
            });
        }
        let elapsed = self.started.elapsed();
        if elapsed > self.timeout {
            return Err(EvalError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
                budget_ms: self.timeout.as_millis() as u64,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sandbox
// ---------------------------------------------------------------------------

/// Wraps the evaluator with the static security pass and the evaluation
/// budget. Either the result matches the unguarded evaluator's, or exactly
/// one security- or budget-class error is raised — never a partial result.
pub struct Sandbox {
    registry: OpRegistry,
    budget: EvaluationBudget,
}

impl Sandbox {
    pub fn new(registry: OpRegistry) -> Self {
        Self {
            registry,
            budget: EvaluationBudget::default(),
        }
    }

    pub fn with_budget(mut self, budget: EvaluationBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn registry(&self) -> &OpRegistry {
        &self.registry
    }

    pub fn budget(&self) -> &EvaluationBudget {
        &self.budget
    }

    pub fn evaluate(&self, expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
        validate_expr(expr)?;
        let mut evaluator = Evaluator::new(&self.registry)
            .with_max_depth(self.budget.max_depth)
            .with_guard(BudgetGuard::new(&self.budget));
        evaluator.evaluate(expr, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UserContext;
    use crate::error::ErrorClass;
    use aw_lang::{CmpOp, FieldPath};
    use serde_json::json;

    fn ctx() -> EvalContext {
        EvalContext::new(Value::from(json!({ "status": "published", "views": 41 })))
            .with_user(UserContext::authenticated("user-1").with_roles(&["editor"]))
    }

    fn field(path: &str) -> Expr {
        Expr::field(FieldPath::parse(path).unwrap())
    }

    fn wide_and(n: usize) -> Expr {
        Expr::op(
            "and",
            (0..n)
                .map(|_| Expr::cond(CmpOp::Eq, field("status"), Expr::literal("published")))
                .collect(),
        )
    }

    #[test]
    fn test_matches_unguarded_result() {
        let expr = Expr::op(
            "and",
            vec![
                Expr::cond(CmpOp::Eq, field("status"), Expr::literal("published")),
                Expr::perm("hasRole", &["editor"]),
            ],
        );
        let sandbox = Sandbox::new(OpRegistry::builtin());
        let guarded = sandbox.evaluate(&expr, &ctx()).unwrap();

        let registry = OpRegistry::builtin();
        let mut unguarded = Evaluator::new(&registry);
        assert_eq!(guarded, unguarded.evaluate(&expr, &ctx()).unwrap());
    }

    #[test]
    fn test_denylisted_path_raises_before_any_operation() {
        // A custom operation records whether it ever ran.
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};
        let ran = Arc::new(AtomicBool::new(false));
        let witness = ran.clone();
        let probe: crate::ops::PureFn = Arc::new(move |_args: &[Value]| {
            witness.store(true, Ordering::SeqCst);
            Ok(Value::Bool(true))
        });
        let registry = OpRegistry::builtin()
            .with_custom([("probe".to_string(), crate::ops::OpEntry::Pure(probe))])
            .unwrap();

        let expr = Expr::op(
            "and",
            vec![Expr::op("probe", vec![]), Expr::exists(field("a.__proto__.b"))],
        );
        let sandbox = Sandbox::new(registry);
        let err = sandbox.evaluate(&expr, &ctx()).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Security);
        assert!(!ran.load(Ordering::SeqCst), "operation ran before validation");
    }

    #[test]
    fn test_depth_overage_is_budget_class() {
        let mut expr = Expr::literal(true);
        for _ in 0..50 {
            expr = Expr::op("not", vec![expr]);
        }
        let sandbox = Sandbox::new(OpRegistry::builtin()).with_budget(EvaluationBudget {
            max_depth: 8,
            ..Default::default()
        });
        let err = sandbox.evaluate(&expr, &ctx()).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Budget);
    }

    #[test]
    fn test_operation_budget_enforced() {
        let sandbox = Sandbox::new(OpRegistry::builtin()).with_budget(EvaluationBudget {
            max_operations: 10,
            ..Default::default()
        });
        let err = sandbox.evaluate(&wide_and(50), &ctx()).unwrap_err();
        assert_eq!(err, EvalError::OperationBudget { max: 10 });
    }

    #[test]
    fn test_timeout_detected_at_next_visit() {
        let sandbox = Sandbox::new(OpRegistry::builtin()).with_budget(EvaluationBudget {
            timeout: Duration::from_millis(0),
            ..Default::default()
        });
        let err = sandbox.evaluate(&wide_and(3), &ctx()).unwrap_err();
        match err {
            EvalError::Timeout { budget_ms, .. } => assert_eq!(budget_ms, 0),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_allow_list_restricts_names() {
        let allowed: HashSet<String> =
            ["eq".to_string(), "and".to_string()].into_iter().collect();
        let sandbox = Sandbox::new(OpRegistry::builtin()).with_budget(EvaluationBudget {
            allowed_operations: Some(allowed),
            ..Default::default()
        });

        let fine = Expr::cond(CmpOp::Eq, field("status"), Expr::literal("published"));
        assert_eq!(sandbox.evaluate(&fine, &ctx()).unwrap(), Value::Bool(true));

        let blocked = Expr::perm("hasRole", &["editor"]);
        let err = sandbox.evaluate(&blocked, &ctx()).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Security);
    }

    #[test]
    fn test_budget_from_config() {
        let config = aw_config::BudgetConfig {
            max_depth: 4,
            max_operations: 7,
            timeout_ms: 250,
            allowed_operations: Some(vec!["eq".to_string()]),
        };
        let budget = EvaluationBudget::from_config(&config);
        assert_eq!(budget.max_depth, 4);
        assert_eq!(budget.max_operations, 7);
        assert_eq!(budget.timeout, Duration::from_millis(250));
        assert!(budget.allowed_operations.unwrap().contains("eq"));
    }
}
