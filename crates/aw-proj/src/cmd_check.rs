use std::path::PathBuf;
use std::process;

use anyhow::Result;

use aw_lang::Action;

use crate::context_file::{build_engine, load_context};

pub fn run(
    resource: String,
    action: String,
    context: PathBuf,
    policies: Vec<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let action: Action = action.parse()?;
    let (engine, _guard) = build_engine(policies, config)?;
    let ctx = load_context(&context)?;

    let allowed = engine
        .check_access(&resource, action, &ctx)
        .map_err(|e| anyhow::anyhow!("access check failed: {e}"))?;

    if allowed {
        println!("allowed");
        Ok(())
    } else {
        println!("denied");
        process::exit(1);
    }
}
