use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use aw_lang::{Policy, PolicySet};

/// On-disk policy file format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    /// `[[policy]]` tables.
    Toml,
    /// A top-level array of policy objects.
    Json,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    policy: Vec<Policy>,
}

/// Parse one policy source in the given format.
pub fn parse_policy_source(source: &str, format: PolicyFormat) -> Result<Vec<Policy>> {
    match format {
        PolicyFormat::Toml => {
            let file: PolicyFile = toml::from_str(source)?;
            Ok(file.policy)
        }
        PolicyFormat::Json => {
            let policies: Vec<Policy> = serde_json::from_str(source)?;
            Ok(policies)
        }
    }
}

/// Load every policy from the files matching the given glob patterns,
/// without building the index — lint tooling wants the raw batch so
/// duplicates surface as diagnostics rather than a hard error.
pub fn load_policy_batch(patterns: &[String], base_dir: &Path) -> Result<Vec<Policy>> {
    let mut policies = Vec::new();
    for pattern in patterns {
        let paths = resolve_policy_glob(pattern, base_dir)?;
        for path in paths {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let format = format_for(&path)?;
            let mut batch = parse_policy_source(&source, format)
                .with_context(|| format!("parsing {}", path.display()))?;
            policies.append(&mut batch);
        }
    }
    Ok(policies)
}

/// Load all policy files matching the given glob patterns and build the
/// immutable policy set. Duplicate (resource, action) bindings across
/// files are a load error — the whole batch is rejected, nothing is
/// partially applied.
pub fn load_policies(patterns: &[String], base_dir: &Path) -> Result<PolicySet> {
    PolicySet::build(load_policy_batch(patterns, base_dir)?)
}

fn format_for(path: &Path) -> Result<PolicyFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(PolicyFormat::Toml),
        Some("json") => Ok(PolicyFormat::Json),
        _ => bail!(
            "unsupported policy file extension for {}; expected .toml or .json",
            path.display()
        ),
    }
}

/// Resolve a glob pattern for policy files. If the pattern contains glob
/// characters, use glob expansion; otherwise treat as a literal path.
/// Matches are sorted so load order is deterministic.
fn resolve_policy_glob(pattern: &str, base_dir: &Path) -> Result<Vec<PathBuf>> {
    if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
        let full = base_dir.join(pattern);
        let full = full
            .to_str()
            .with_context(|| format!("non-UTF-8 glob pattern: {}", full.display()))?;
        let mut paths = Vec::new();
        for entry in glob::glob(full).with_context(|| format!("invalid glob `{pattern}`"))? {
            paths.push(entry?);
        }
        paths.sort();
        Ok(paths)
    } else {
        let path = base_dir.join(pattern);
        if path.exists() {
            Ok(vec![path])
        } else {
            bail!("policy file not found: {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aw_lang::{Action, CmpOp, Expr, FieldPath};

    const TOML_POLICIES: &str = r#"
        [[policy]]
        resource = "documents"
        action = "read"

        [policy.allow]
        kind = "op"
        name = "or"

        [[policy.allow.args]]
        kind = "cond"
        op = "eq"
        left = { kind = "field", path = "isPublic" }
        right = { kind = "literal", value = true }

        [[policy.allow.args]]
        kind = "perm"
        check = "hasRole"
        args = ["admin"]

        [[policy]]
        resource = "documents"
        action = "delete"
        allow = { kind = "perm", check = "hasRole", args = ["admin"] }
    "#;

    #[test]
    fn test_toml_policies_parse() {
        let policies = parse_policy_source(TOML_POLICIES, PolicyFormat::Toml).unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0].resource, "documents");
        assert_eq!(policies[0].action, Action::Read);
        match &policies[0].allow {
            Expr::Op { name, args } => {
                assert_eq!(name, "or");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected op node, got {:?}", other),
        }
        assert_eq!(policies[1].action, Action::Delete);
    }

    #[test]
    fn test_json_and_toml_agree() {
        let json = r#"[
            {
                "resource": "documents",
                "action": "update",
                "allow": {
                    "kind": "cond",
                    "op": "eq",
                    "left": { "kind": "field", "path": "ownerId" },
                    "right": { "kind": "field", "path": "user.id" }
                },
                "fields": { "write": ["title", "body"], "deny": ["ownerId"] }
            }
        ]"#;
        let from_json = parse_policy_source(json, PolicyFormat::Json).unwrap();
        assert_eq!(from_json.len(), 1);
        assert_eq!(
            from_json[0].allow,
            Expr::cond(
                CmpOp::Eq,
                Expr::field(FieldPath::parse("ownerId").unwrap()),
                Expr::field(FieldPath::parse("user.id").unwrap()),
            )
        );
        let fields = from_json[0].fields.as_ref().unwrap();
        assert_eq!(fields.deny, vec!["ownerId".to_string()]);
    }

    #[test]
    fn test_duplicate_across_batch_rejected() {
        let policies = parse_policy_source(TOML_POLICIES, PolicyFormat::Toml).unwrap();
        let doubled: Vec<Policy> = policies.iter().chain(policies.iter()).cloned().collect();
        assert!(PolicySet::build(doubled).is_err());
    }

    #[test]
    fn test_policy_set_builds() {
        let policies = parse_policy_source(TOML_POLICIES, PolicyFormat::Toml).unwrap();
        let set = PolicySet::build(policies).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.get("documents", Action::Read).is_some());
        assert!(set.get("documents", Action::Create).is_none());
    }
}
