use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    TokenBindingMatch,
    MembershipFound,
    RestaurantAccessDenied,
    ScopesGranted,
    InsufficientScope,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::TokenBindingMatch => "TOKEN_BINDING_MATCH",
            DecisionReason::MembershipFound => "MEMBERSHIP_FOUND",
            DecisionReason::RestaurantAccessDenied => "RESTAURANT_ACCESS_DENIED",
            DecisionReason::ScopesGranted => "SCOPES_GRANTED",
            DecisionReason::InsufficientScope => "INSUFFICIENT_SCOPE",
        }
    }
}

/// Outcome of a restaurant-access or scope check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_scopes: Vec<String>,
}

impl Decision {
    pub fn allow(reason: DecisionReason) -> Self {
        Self { allowed: true, reason, missing_scopes: Vec::new() }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self { allowed: false, reason, missing_scopes: Vec::new() }
    }

    pub fn insufficient_scope(missing: Vec<String>) -> Self {
        Self { allowed: false, reason: DecisionReason::InsufficientScope, missing_scopes: missing }
    }
}
