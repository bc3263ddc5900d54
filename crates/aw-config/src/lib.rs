pub mod budget;
pub mod logging;
pub mod project;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub use budget::BudgetConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use project::{PolicyFormat, load_policies, load_policy_batch, parse_policy_source};

/// Top-level deployment configuration (`warden.toml`). Every section has
/// defaults so a minimal deployment may omit the file entirely.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Policy file glob patterns, resolved against the config file's
    /// parent directory (e.g. `["policies/*.toml"]`).
    pub policies: Vec<String>,
    pub budget: BudgetConfig,
    pub logging: LoggingConfig,
}

pub fn load_config(path: &Path) -> Result<WardenConfig> {
    let source =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: WardenConfig =
        toml::from_str(&source).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_gets_defaults() {
        let config: WardenConfig = toml::from_str("").unwrap();
        assert!(config.policies.is_empty());
        assert_eq!(config.budget.max_depth, 32);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_sections_parse() {
        let config: WardenConfig = toml::from_str(
            r#"
            policies = ["policies/*.toml"]

            [budget]
            max_depth = 16
            timeout_ms = 50

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.policies, vec!["policies/*.toml".to_string()]);
        assert_eq!(config.budget.max_depth, 16);
        assert_eq!(config.budget.timeout_ms, 50);
        // Unset budget fields keep their defaults.
        assert_eq!(config.budget.max_operations, 10_000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
