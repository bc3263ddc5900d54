mod fields;
mod row_filter;


pub use fields::{FieldList, FieldSets, apply_field_filter, resolve_field_sets};
pub use row_filter::extract_row_filter;

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};
use orion_error::prelude::*;

use aw_lang::{Action, Expr, PolicySet, RowFilter, Value};

use crate::context::EvalContext;
use crate::error::{CoreError, CoreReason, CoreResult};
use crate::ops::OpRegistry;
use crate::sandbox::{Sandbox, validate_expr};

// ---------------------------------------------------------------------------
// PolicyEngine
// ---------------------------------------------------------------------------

/// Binds rules to (resource, action) and answers the three authorization
/// questions: may the actor act, which rows may a query return, and which
/// fields may cross the boundary.
///
/// The policy set lives behind an atomic reference swap: readers clone the
/// `Arc`, so an in-flight evaluation always observes one fully-formed set
/// even while a reload replaces it.
pub struct PolicyEngine {
    policies: RwLock<Arc<PolicySet>>,
    sandbox: Sandbox,
}

impl PolicyEngine {
    pub fn new(policies: PolicySet) -> Self {
        Self::with_sandbox(policies, Sandbox::new(OpRegistry::builtin()))
    }

    pub fn with_sandbox(policies: PolicySet, sandbox: Sandbox) -> Self {
        Self {
            policies: RwLock::new(Arc::new(policies)),
            sandbox,
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Atomically replace the whole policy set.
    pub fn reload(&self, policies: PolicySet) {
        let mut slot = self
            .policies
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(policies);
    }

    fn snapshot(&self) -> Arc<PolicySet> {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Decide whether the actor may perform `action` on `resource`.
    ///
    /// Fail-closed throughout: a missing policy, a falsey allow expression
    /// and a plain evaluation error (malformed policy) all resolve to the
    /// same canonical denied result. Security and budget errors are the
    /// exception — they propagate, never default.
    pub fn check_access(
        &self,
        resource: &str,
        action: Action,
        ctx: &EvalContext,
    ) -> CoreResult<bool> {
        let set = self.snapshot();
        let Some(policy) = set.get(resource, action) else {
            return Ok(denied(resource, action, "no policy registered"));
        };
        match self.sandbox.evaluate(&policy.allow, ctx) {
            Ok(value) if value.is_truthy() => Ok(true),
            Ok(_) => Ok(denied(resource, action, "allow expression is falsey")),
            Err(e) if e.is_terminal() => Err(CoreError::from(e)),
            Err(e) => {
                warn!("policy {resource}/{action} failed to evaluate: {e}");
                Ok(denied(resource, action, "evaluation error"))
            }
        }
    }

    /// Derive the storage filter for a query against `resource`. A missing
    /// policy is an error rather than an unconstrained filter — handing
    /// storage no constraint for a rule that does not exist would fetch
    /// rows the access check already denies.
    pub fn row_filter(
        &self,
        resource: &str,
        action: Action,
        ctx: &EvalContext,
    ) -> CoreResult<RowFilter> {
        let set = self.snapshot();
        let Some(policy) = set.get(resource, action) else {
            return StructError::from(CoreReason::Policy)
                .with_detail(format!("no policy registered for {resource}/{action}"))
                .err();
        };
        validate_expr(&policy.allow).map_err(CoreError::from)?;
        Ok(extract_row_filter(&policy.allow, ctx))
    }

    /// Resolved field read/write sets for `resource`/`action`.
    pub fn field_sets(&self, resource: &str, action: Action) -> CoreResult<FieldSets> {
        let set = self.snapshot();
        let Some(policy) = set.get(resource, action) else {
            return StructError::from(CoreReason::Policy)
                .with_detail(format!("no policy registered for {resource}/{action}"))
                .err();
        };
        Ok(resolve_field_sets(policy.fields.as_ref()))
    }

    /// Sandboxed evaluation of a free-standing expression, for computed
    /// fields and other non-authorization uses. Callers on this path may
    /// log plain evaluation failures and substitute null; authorization
    /// callers must use [`PolicyEngine::check_access`].
    pub fn evaluate(&self, expr: &Expr, ctx: &EvalContext) -> CoreResult<Value> {
        self.sandbox.evaluate(expr, ctx).map_err(CoreError::from)
    }
}

/// The canonical denied result. Every deny funnels through here so a later
/// refactor cannot quietly introduce a permissive third branch.
fn denied(resource: &str, action: Action, cause: &str) -> bool {
    debug!("denied {resource}/{action}: {cause}");
    false
}
