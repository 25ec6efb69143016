use common_auth::{IdentityClaim, Role, Tier};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// A verified caller, classified by how it was admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum Identity {
    Persistent {
        user_id: Uuid,
        role: Role,
        home_restaurant: Option<Uuid>,
    },
    Station {
        subject_id: String,
        role: Role,
        restaurant_id: Uuid,
    },
    Ephemeral {
        subject_id: String,
        restaurant_id: Uuid,
    },
}

impl Identity {
    pub fn tier(&self) -> Tier {
        match self {
            Identity::Persistent { .. } => Tier::Persistent,
            Identity::Station { .. } => Tier::Station,
            Identity::Ephemeral { .. } => Tier::Ephemeral,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Persistent { role, .. } | Identity::Station { role, .. } => *role,
            Identity::Ephemeral { .. } => Role::Customer,
        }
    }

    pub fn subject_id(&self) -> String {
        match self {
            Identity::Persistent { user_id, .. } => user_id.to_string(),
            Identity::Station { subject_id, .. } | Identity::Ephemeral { subject_id, .. } => {
                subject_id.clone()
            }
        }
    }

    /// Restaurant fixed into the token at issuance. Persistent identities are not bound.
    pub fn binding(&self) -> Option<Uuid> {
        match self {
            Identity::Persistent { .. } => None,
            Identity::Station { restaurant_id, .. } | Identity::Ephemeral { restaurant_id, .. } => {
                Some(*restaurant_id)
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("subject prefix does not match role '{0}'")]
    SubjectPrefixMismatch(Role),
    #[error("role '{0}' requires a restaurant binding")]
    MissingBinding(Role),
    #[error("persistent subject '{0}' is not a user id")]
    InvalidPersistentSubject(String),
}

/// Maps a verified claim onto exactly one identity tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    pub fn resolve(&self, claim: &IdentityClaim) -> Result<Identity, IdentityError> {
        let ephemeral_subject = claim.has_ephemeral_subject();
        match claim.role.tier() {
            Tier::Ephemeral => {
                if !ephemeral_subject {
                    return Err(IdentityError::SubjectPrefixMismatch(claim.role));
                }
                let restaurant_id = claim.restaurant_id.ok_or(IdentityError::MissingBinding(claim.role))?;
                Ok(Identity::Ephemeral { subject_id: claim.subject_id.clone(), restaurant_id })
            }
            _ if ephemeral_subject => Err(IdentityError::SubjectPrefixMismatch(claim.role)),
            Tier::Station => {
                let restaurant_id = claim.restaurant_id.ok_or(IdentityError::MissingBinding(claim.role))?;
                Ok(Identity::Station {
                    subject_id: claim.subject_id.clone(),
                    role: claim.role,
                    restaurant_id,
                })
            }
            Tier::Persistent => {
                let user_id = Uuid::parse_str(&claim.subject_id)
                    .map_err(|_| IdentityError::InvalidPersistentSubject(claim.subject_id.clone()))?;
                Ok(Identity::Persistent {
                    user_id,
                    role: claim.role,
                    home_restaurant: claim.restaurant_id,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use chrono::Utc;

    fn claim(subject: &str, role: Role, restaurant_id: Option<Uuid>) -> IdentityClaim {
        let now = Utc::now();
        IdentityClaim {
            subject_id: subject.to_string(),
            role,
            restaurant_id,
            scopes: BTreeSet::new(),
            issued_at: now,
            expires_at: now + chrono::Duration::minutes(5),
            issuer: "test".into(),
            audience: vec!["test".into()],
            token_id: None,
        }
    }

    #[test]
    fn customer_with_guest_subject_is_ephemeral() {
        let rid = Uuid::new_v4();
        let identity = IdentityResolver
            .resolve(&claim("guest:abc", Role::Customer, Some(rid)))
            .expect("ephemeral");
        assert_eq!(identity.tier(), Tier::Ephemeral);
        assert_eq!(identity.binding(), Some(rid));
        assert_eq!(identity.role(), Role::Customer);
    }

    #[test]
    fn customer_without_prefix_is_rejected() {
        let err = IdentityResolver
            .resolve(&claim("abc", Role::Customer, Some(Uuid::new_v4())))
            .expect_err("prefix required");
        assert_eq!(err, IdentityError::SubjectPrefixMismatch(Role::Customer));
    }

    #[test]
    fn staff_with_guest_prefix_is_rejected() {
        let err = IdentityResolver
            .resolve(&claim("guest:abc", Role::Manager, None))
            .expect_err("staff cannot use guest subject");
        assert_eq!(err, IdentityError::SubjectPrefixMismatch(Role::Manager));
    }

    #[test]
    fn station_requires_binding() {
        let err = IdentityResolver
            .resolve(&claim("station:1", Role::Kitchen, None))
            .expect_err("binding required");
        assert_eq!(err, IdentityError::MissingBinding(Role::Kitchen));
    }

    #[test]
    fn persistent_subject_must_be_uuid() {
        let user = Uuid::new_v4();
        let identity = IdentityResolver
            .resolve(&claim(&user.to_string(), Role::Server, None))
            .expect("persistent");
        assert_eq!(identity, Identity::Persistent { user_id: user, role: Role::Server, home_restaurant: None });

        let err = IdentityResolver
            .resolve(&claim("not-a-uuid", Role::Owner, None))
            .expect_err("uuid subject");
        assert!(matches!(err, IdentityError::InvalidPersistentSubject(_)));
    }
}
