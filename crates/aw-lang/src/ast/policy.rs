use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::ast::expr::Expr;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// The action a policy authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => bail!("unknown action `{other}`; expected create, read, update or delete"),
        }
    }
}

/// Declared field-level access for a policy. `["*"]` means every field;
/// omitted lists default to every field. `deny` is subtracted from both
/// lists after resolution, regardless of declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    pub read: Option<Vec<String>>,
    pub write: Option<Vec<String>>,
    pub deny: Vec<String>,
}

/// One (resource, action) authorization rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub resource: String,
    pub action: Action,
    pub allow: Expr,
    #[serde(default)]
    pub fields: Option<FieldSpec>,
}

impl Policy {
    /// `resource/action` label used in diagnostics.
    pub fn label(&self) -> String {
        format!("{}/{}", self.resource, self.action)
    }
}

// ---------------------------------------------------------------------------
// Policy set
// ---------------------------------------------------------------------------

/// An immutable (resource, action) index over a batch of policies.
///
/// Built once from a fully-loaded batch; a reload builds a fresh set and
/// swaps it in whole, so readers never observe a half-updated index.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    by_key: HashMap<(String, Action), Policy>,
}

impl PolicySet {
    pub fn build(policies: Vec<Policy>) -> Result<Self> {
        let mut by_key = HashMap::with_capacity(policies.len());
        for policy in policies {
            if policy.resource.is_empty() {
                bail!("policy for action `{}` has an empty resource name", policy.action);
            }
            let key = (policy.resource.clone(), policy.action);
            if by_key.contains_key(&key) {
                bail!("duplicate policy for `{}`", policy.label());
            }
            by_key.insert(key, policy);
        }
        Ok(Self { by_key })
    }

    pub fn get(&self, resource: &str, action: Action) -> Option<&Policy> {
        self.by_key.get(&(resource.to_string(), action))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Policy> {
        self.by_key.values()
    }
}
