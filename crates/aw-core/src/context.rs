use std::collections::BTreeMap;

use serde::Deserialize;

use aw_lang::Value;

// ---------------------------------------------------------------------------
// UserContext
// ---------------------------------------------------------------------------

/// The acting identity, as supplied by the session layer. An absent or
/// empty `id` means the caller is anonymous.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub id: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl UserContext {
    pub fn authenticated(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Value view backing `user.*` field references and filter resolution.
    fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert(
            "id".to_string(),
            match &self.id {
                Some(id) => Value::Str(id.clone()),
                None => Value::Null,
            },
        );
        map.insert(
            "roles".to_string(),
            Value::Array(self.roles.iter().map(|r| Value::Str(r.clone())).collect()),
        );
        map.insert(
            "permissions".to_string(),
            Value::Array(
                self.permissions
                    .iter()
                    .map(|p| Value::Str(p.clone()))
                    .collect(),
            ),
        );
        Value::Object(map)
    }
}

// ---------------------------------------------------------------------------
// EvalContext
// ---------------------------------------------------------------------------

/// Read-only context for one evaluation: the candidate record, the acting
/// user, caller parameters and ambient globals.
///
/// Construction takes ownership of the values, so caller objects are never
/// aliased; evaluation only ever sees `&EvalContext`, so no operation can
/// write back into it — the borrow checker supplies the isolation that
/// would otherwise require deep-freezing a structural copy.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalContext {
    data: Value,
    user: UserContext,
    user_doc: Value,
    params: Value,
    globals: Value,
}

impl EvalContext {
    pub fn new(data: Value) -> Self {
        let user = UserContext::default();
        let user_doc = user.to_value();
        Self {
            data,
            user,
            user_doc,
            params: Value::Object(BTreeMap::new()),
            globals: Value::Object(BTreeMap::new()),
        }
    }

    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user_doc = user.to_value();
        self.user = user;
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_globals(mut self, globals: Value) -> Self {
        self.globals = globals;
        self
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }

    /// The user as a value tree, for `user.*` field references.
    pub fn user_doc(&self) -> &Value {
        &self.user_doc
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn globals(&self) -> &Value {
        &self.globals
    }
}
