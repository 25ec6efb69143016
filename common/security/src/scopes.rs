use std::collections::{BTreeSet, HashMap};
use std::env;

use anyhow::Context;
use common_auth::Role;
use thiserror::Error;
use tracing::info;

/// Capability strings understood by the ordering services.
pub mod scope {
    pub const ORDERS_CREATE: &str = "orders:create";
    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_READ_OWN: &str = "orders:read_own";
    pub const ORDERS_UPDATE_STATUS: &str = "orders:update_status";
    pub const PAYMENTS_CREATE: &str = "payments:create";
    pub const PAYMENTS_READ_AUDIT: &str = "payments:read_audit";
    pub const REPORTS_VIEW: &str = "reports:view";
    pub const STATIONS_ISSUE: &str = "stations:issue";

    pub const ALL: &[&str] = &[
        ORDERS_CREATE,
        ORDERS_READ,
        ORDERS_READ_OWN,
        ORDERS_UPDATE_STATUS,
        PAYMENTS_CREATE,
        PAYMENTS_READ_AUDIT,
        REPORTS_VIEW,
        STATIONS_ISSUE,
    ];

    /// Upper bound for self-service customers: place an order, pay for it, read it back.
    pub const CUSTOMER_CEILING: &[&str] = &[ORDERS_CREATE, PAYMENTS_CREATE, ORDERS_READ_OWN];
}

#[derive(Debug, Error)]
pub enum ScopeRegistryError {
    #[error("scope registry JSON is invalid: {0}")]
    InvalidJson(String),
    #[error("unknown role '{0}' in scope registry")]
    UnknownRole(String),
    #[error("customer role may not be granted '{0}'")]
    CustomerScopeTooBroad(String),
}

/// Role-indexed scope grants, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ScopeRegistry {
    grants: HashMap<Role, BTreeSet<String>>,
}

impl ScopeRegistry {
    pub fn scopes_for(&self, role: Role) -> &BTreeSet<String> {
        // every role is present; see `from_grants`
        &self.grants[&role]
    }

    /// Required scopes the role lacks, in the order they were asked for.
    pub fn missing<'a>(&self, role: Role, required: &[&'a str]) -> Vec<&'a str> {
        let granted = self.scopes_for(role);
        required
            .iter()
            .copied()
            .filter(|scope| !granted.contains(*scope))
            .collect()
    }

    pub fn from_json(raw: &str) -> Result<Self, ScopeRegistryError> {
        let parsed: HashMap<String, Vec<String>> =
            serde_json::from_str(raw).map_err(|err| ScopeRegistryError::InvalidJson(err.to_string()))?;
        let mut grants = HashMap::new();
        for (name, scopes) in parsed {
            let role = name
                .parse::<Role>()
                .map_err(|_| ScopeRegistryError::UnknownRole(name.clone()))?;
            grants.insert(role, scopes.into_iter().collect::<BTreeSet<_>>());
        }
        Self::from_grants(grants)
    }

    /// `SCOPE_REGISTRY_JSON` replaces the whole matrix when set.
    pub fn from_env() -> anyhow::Result<Self> {
        match env::var("SCOPE_REGISTRY_JSON") {
            Ok(raw) if !raw.trim().is_empty() => {
                let registry = Self::from_json(&raw).context("SCOPE_REGISTRY_JSON rejected")?;
                info!("scope registry loaded from SCOPE_REGISTRY_JSON");
                Ok(registry)
            }
            _ => Ok(Self::default()),
        }
    }

    fn from_grants(mut grants: HashMap<Role, BTreeSet<String>>) -> Result<Self, ScopeRegistryError> {
        for role in Role::ALL {
            grants.entry(role).or_default();
        }
        if let Some(too_broad) = grants[&Role::Customer]
            .iter()
            .find(|granted| !scope::CUSTOMER_CEILING.contains(&granted.as_str()))
        {
            return Err(ScopeRegistryError::CustomerScopeTooBroad(too_broad.clone()));
        }
        Ok(Self { grants })
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        use scope::*;
        let set = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        let floor_staff = [ORDERS_CREATE, ORDERS_READ, ORDERS_UPDATE_STATUS, PAYMENTS_CREATE];
        let device = [ORDERS_READ, ORDERS_UPDATE_STATUS];

        let grants = HashMap::from([
            (Role::Owner, set(ALL)),
            (Role::Manager, set(ALL)),
            (Role::Server, set(&floor_staff)),
            (Role::Cashier, set(&[&floor_staff[..], &[PAYMENTS_READ_AUDIT]].concat())),
            (Role::Kitchen, set(&device)),
            (Role::Expo, set(&device)),
            (Role::Station, set(&device)),
            (Role::Customer, set(CUSTOMER_CEILING)),
        ]);
        Self { grants }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_defaults_are_narrow() {
        let registry = ScopeRegistry::default();
        let customer = registry.scopes_for(Role::Customer);
        assert_eq!(customer.len(), 3);
        assert!(customer.contains(scope::ORDERS_READ_OWN));
        assert!(!customer.contains(scope::ORDERS_UPDATE_STATUS));
        assert!(!customer.contains(scope::REPORTS_VIEW));
    }

    #[test]
    fn identical_roles_share_scopes() {
        let registry = ScopeRegistry::default();
        assert_eq!(registry.scopes_for(Role::Kitchen), registry.scopes_for(Role::Expo));
        assert_eq!(registry.scopes_for(Role::Owner).len(), scope::ALL.len());
    }

    #[test]
    fn missing_lists_only_absent_scopes() {
        let registry = ScopeRegistry::default();
        let missing = registry.missing(Role::Server, &[scope::ORDERS_READ, scope::REPORTS_VIEW]);
        assert_eq!(missing, vec![scope::REPORTS_VIEW]);
    }

    #[test]
    fn json_fills_unlisted_roles_with_nothing() {
        let registry = ScopeRegistry::from_json(r#"{"owner": ["orders:read"]}"#).expect("valid json");
        assert!(registry.scopes_for(Role::Owner).contains(scope::ORDERS_READ));
        assert!(registry.scopes_for(Role::Manager).is_empty());
    }

    #[test]
    fn json_rejects_broad_customer_grants() {
        let err = ScopeRegistry::from_json(r#"{"customer": ["orders:update_status"]}"#)
            .expect_err("customer ceiling enforced");
        assert!(matches!(err, ScopeRegistryError::CustomerScopeTooBroad(s) if s == "orders:update_status"));
    }

    #[test]
    fn json_rejects_unknown_roles() {
        let err = ScopeRegistry::from_json(r#"{"super_admin": []}"#).expect_err("unknown role");
        assert!(matches!(err, ScopeRegistryError::UnknownRole(_)));
    }
}
