pub mod lint;

use std::collections::HashSet;

use crate::ast::expr::{CmpOp, Expr};
use crate::ast::policy::Policy;

/// Severity level for policy check diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Policy check diagnostic with optional policy context.
#[derive(Debug, Clone)]
pub struct CheckError {
    pub severity: Severity,
    pub policy: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.policy {
            Some(p) => write!(f, "{}: policy `{}`: {}", prefix, p, self.message),
            None => write!(f, "{}: {}", prefix, self.message),
        }
    }
}

fn error(policy: &Policy, message: String, errors: &mut Vec<CheckError>) {
    errors.push(CheckError {
        severity: Severity::Error,
        policy: Some(policy.label()),
        message,
    });
}

/// Perform error-level checks on a batch of policies before they are built
/// into a set. Returns an empty Vec when all checks pass.
pub fn check_policies(policies: &[Policy]) -> Vec<CheckError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<(String, crate::ast::policy::Action)> = HashSet::new();

    for policy in policies {
        if policy.resource.is_empty() {
            error(policy, "resource name is empty".to_string(), &mut errors);
        }
        if !seen.insert((policy.resource.clone(), policy.action)) {
            error(
                policy,
                "duplicate binding for this resource and action".to_string(),
                &mut errors,
            );
        }

        check_expr(policy, &policy.allow, &mut errors);

        if let Some(fields) = &policy.fields
            && fields.deny.iter().any(|f| f == "*")
        {
            error(
                policy,
                "deny list may not contain `*`; list the fields to withhold".to_string(),
                &mut errors,
            );
        }
    }

    errors
}

fn check_expr(policy: &Policy, expr: &Expr, errors: &mut Vec<CheckError>) {
    match expr {
        Expr::Literal { .. } | Expr::Field { .. } => {}
        Expr::Op { name, args } => {
            if name.is_empty() {
                error(policy, "operation has an empty name".to_string(), errors);
            }
            for arg in args {
                check_expr(policy, arg, errors);
            }
        }
        Expr::Cond { op, left, right } => {
            if *op != CmpOp::Exists && right.is_none() {
                error(
                    policy,
                    format!("comparator `{}` requires a right-hand side", op.name()),
                    errors,
                );
            }
            check_expr(policy, left, errors);
            if let Some(right) = right {
                check_expr(policy, right, errors);
            }
        }
        Expr::Perm { check, .. } => {
            if check.is_empty() {
                error(
                    policy,
                    "permission check has an empty name".to_string(),
                    errors,
                );
            }
        }
    }
}
