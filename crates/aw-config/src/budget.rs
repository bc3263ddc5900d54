use serde::Deserialize;

/// Sandbox budget configuration. All fields have defaults so the entire
/// `[budget]` section may be omitted from `warden.toml`. Defaults are
/// deliberately conservative; raise them per deployment, not globally.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Maximum expression tree depth per evaluation.
    pub max_depth: usize,
    /// Maximum operation/condition/permission nodes visited per evaluation.
    pub max_operations: u64,
    /// Wall-clock ceiling per evaluation, in milliseconds.
    pub timeout_ms: u64,
    /// Optional allow-list of operation names. Omitted means the full
    /// registry is available.
    pub allowed_operations: Option<Vec<String>>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_operations: 10_000,
            timeout_ms: 100,
            allowed_operations: None,
        }
    }
}
