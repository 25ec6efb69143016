use std::sync::Arc;

use crate::decision::{Decision, DecisionReason};
use crate::identity::Identity;
use crate::scopes::ScopeRegistry;

/// Grants come from the role's registry entry, never from scopes written into the token.
#[derive(Debug, Clone)]
pub struct RoleAuthorizer {
    registry: Arc<ScopeRegistry>,
}

impl RoleAuthorizer {
    pub fn new(registry: Arc<ScopeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    pub fn authorize(&self, identity: &Identity, required: &[&str]) -> Decision {
        let missing = self.registry.missing(identity.role(), required);
        if missing.is_empty() {
            Decision::allow(DecisionReason::ScopesGranted)
        } else {
            Decision::insufficient_scope(missing.into_iter().map(str::to_string).collect())
        }
    }
}
