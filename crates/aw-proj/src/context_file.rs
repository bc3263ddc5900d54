use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, ensure};
use serde::Deserialize;

use aw_config::WardenConfig;
use aw_core::{EvalContext, EvaluationBudget, OpRegistry, PolicyEngine, Sandbox, UserContext};
use aw_lang::Value;

/// JSON context file consumed by `check` and `explain`:
/// `{ "data": {...}, "user": {"id": ..., "roles": [...]}, "params": {...},
/// "globals": {...} }`. Every section may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContextFile {
    pub data: serde_json::Value,
    pub user: UserContext,
    pub params: serde_json::Value,
    pub globals: serde_json::Value,
}

pub fn load_context(path: &Path) -> Result<EvalContext> {
    let source =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: ContextFile =
        serde_json::from_str(&source).with_context(|| format!("parsing {}", path.display()))?;
    Ok(EvalContext::new(Value::from(file.data))
        .with_user(file.user)
        .with_params(Value::from(file.params))
        .with_globals(Value::from(file.globals)))
}

/// Resolve configuration and policy patterns into a ready engine. The
/// returned guard (when file logging is configured) must be held until the
/// process exits.
pub fn build_engine(
    policies: Vec<String>,
    config_path: Option<PathBuf>,
) -> Result<(PolicyEngine, Option<tracing_appender::non_blocking::WorkerGuard>)> {
    let (config, base_dir) = match &config_path {
        Some(path) => {
            let config = aw_config::load_config(path)?;
            let base = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            (config, base)
        }
        None => (WardenConfig::default(), std::env::current_dir()?),
    };
    let guard = crate::tracing_init::init_tracing(&config.logging, &base_dir)?;

    let patterns = if policies.is_empty() {
        config.policies.clone()
    } else {
        policies
    };
    ensure!(
        !patterns.is_empty(),
        "no policy files given; pass --policies or set `policies` in warden.toml"
    );
    let set = aw_config::load_policies(&patterns, &base_dir)?;

    let sandbox = Sandbox::new(OpRegistry::builtin())
        .with_budget(EvaluationBudget::from_config(&config.budget));
    Ok((PolicyEngine::with_sandbox(set, sandbox), guard))
}
