use std::path::PathBuf;

use anyhow::Result;

use aw_core::FieldList;
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

    println!("request:  {resource}/{action}");

    let allowed = engine
        .check_access(&resource, action, &ctx)
        .map_err(|e| anyhow::anyhow!("access check failed: {e}"))?;
    println!("decision: {}", if allowed { "allow" } else { "deny" });

    match engine.row_filter(&resource, action, &ctx) {
        Ok(filter) => {
            println!("row filter:\n{}", serde_json::to_string_pretty(&filter)?);
        }
        Err(e) => println!("row filter: unavailable ({e})"),
    }

    match engine.field_sets(&resource, action) {
        Ok(sets) => {
            println!("read fields:  {}", render_field_list(&sets.read));
            println!("write fields: {}", render_field_list(&sets.write));
        }
        Err(e) => println!("fields: unavailable ({e})"),
    }

    Ok(())
}

fn render_field_list(list: &FieldList) -> String {
    match list {
        FieldList::All { except } if except.is_empty() => "*".to_string(),
        FieldList::All { except } => format!("* except {}", except.join(", ")),
        FieldList::Listed(fields) if fields.is_empty() => "(none)".to_string(),
        FieldList::Listed(fields) => fields.join(", "),
    }
}
