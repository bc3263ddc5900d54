use crate::ast::expr::Expr;
use crate::ast::policy::Policy;
use crate::checker::{CheckError, Severity};

fn warn(policy: &Policy, message: String, out: &mut Vec<CheckError>) {
    out.push(CheckError {
        severity: Severity::Warning,
        policy: Some(policy.label()),
        message,
    });
}

/// Lint-level checks: likely mistakes that do not make a policy invalid.
///
/// `known_operations` is the name surface of the registry the policies will
/// run against (builtin names, plus any custom operations the deployment
/// registers); names outside it are warned about rather than rejected.
pub fn lint_policies(policies: &[Policy], known_operations: &[String]) -> Vec<CheckError> {
    let mut warnings = Vec::new();

    for policy in policies {
        if let Expr::Literal { value } = &policy.allow
            && !value.is_truthy()
        {
            warn(
                policy,
                "allow expression is a constant falsey literal; this policy always denies"
                    .to_string(),
                &mut warnings,
            );
        }

        lint_expr(policy, &policy.allow, known_operations, &mut warnings);

        if let Some(fields) = &policy.fields {
            for list in [&fields.read, &fields.write].into_iter().flatten() {
                if list.iter().any(|f| f == "*") && list.len() > 1 {
                    warn(
                        policy,
                        "field list mixes `*` with named fields; the named entries are redundant"
                            .to_string(),
                        &mut warnings,
                    );
                }
            }
            if let (Some(read), Some(write)) = (&fields.read, &fields.write) {
                for denied in &fields.deny {
                    let read_all = read.iter().any(|f| f == "*");
                    let write_all = write.iter().any(|f| f == "*");
                    if !read_all
                        && !write_all
                        && !read.contains(denied)
                        && !write.contains(denied)
                    {
                        warn(
                            policy,
                            format!(
                                "deny field `{denied}` appears in neither read nor write list"
                            ),
                            &mut warnings,
                        );
                    }
                }
            }
        }
    }

    warnings
}

fn lint_expr(
    policy: &Policy,
    expr: &Expr,
    known_operations: &[String],
    out: &mut Vec<CheckError>,
) {
    match expr {
        Expr::Literal { .. } | Expr::Field { .. } => {}
        Expr::Op { name, args } => {
            if !known_operations.iter().any(|k| k == name) {
                warn(
                    policy,
                    format!("unknown operation `{name}`; evaluation will fail closed"),
                    out,
                );
            }
            if name == "matches"
                && let Some(Expr::Literal { value }) = args.get(1)
                && let Some(pattern) = value.as_str()
                && let Err(e) = regex_syntax::Parser::new().parse(pattern)
            {
                warn(
                    policy,
                    format!("invalid regex `{pattern}` in matches(): {e}"),
                    out,
                );
            }
            for arg in args {
                lint_expr(policy, arg, known_operations, out);
            }
        }
        Expr::Cond { left, right, .. } => {
            lint_expr(policy, left, known_operations, out);
            if let Some(right) = right {
                lint_expr(policy, right, known_operations, out);
            }
        }
        Expr::Perm { check, .. } => {
            if !known_operations.iter().any(|k| k == check) {
                warn(
                    policy,
                    format!("unknown permission check `{check}`; evaluation will fail closed"),
                    out,
                );
            }
        }
    }
}
