use std::process;

use anyhow::{Result, ensure};

use aw_core::OpRegistry;
use aw_lang::Severity;

pub fn run(patterns: Vec<String>) -> Result<()> {
    ensure!(!patterns.is_empty(), "no policy file patterns given");
    let cwd = std::env::current_dir()?;

    let policies = aw_config::load_policy_batch(&patterns, &cwd)?;

    // Error-level checks
    let errors = aw_lang::check_policies(&policies);

    // Lint-level checks against the builtin operation surface
    let known = OpRegistry::builtin().names();
    let warnings = aw_lang::lint_policies(&policies, &known);

    let total = errors.len() + warnings.len();
    let mut has_errors = false;

    for diag in errors.iter().chain(warnings.iter()) {
        if diag.severity == Severity::Error {
            has_errors = true;
        }
        eprintln!("{diag}");
    }

    if total == 0 {
        eprintln!("No issues found in {} policy(ies).", policies.len());
    } else {
        eprintln!("\n{} error(s), {} warning(s)", errors.len(), warnings.len());
    }

    if has_errors {
        process::exit(1);
    }

    Ok(())
}
