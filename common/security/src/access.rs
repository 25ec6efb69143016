use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::decision::{Decision, DecisionReason};
use crate::error::SecurityError;
use crate::identity::Identity;
use crate::membership::MembershipStore;

/// Decides whether an identity may act on a restaurant.
///
/// Station and ephemeral identities are bound at issuance: the binding is compared
/// and the membership store is never consulted. Persistent identities need a
/// membership row; a missing row denies and a store failure is surfaced rather than
/// treated as either outcome.
#[derive(Clone)]
pub struct RestaurantAccessGuard {
    memberships: Arc<dyn MembershipStore>,
}

impl RestaurantAccessGuard {
    pub fn new(memberships: Arc<dyn MembershipStore>) -> Self {
        Self { memberships }
    }

    pub async fn check_access(&self, identity: &Identity, restaurant_id: Uuid) -> Result<Decision, SecurityError> {
        match identity {
            Identity::Station { restaurant_id: bound, .. } | Identity::Ephemeral { restaurant_id: bound, .. } => {
                if *bound == restaurant_id {
                    Ok(Decision::allow(DecisionReason::TokenBindingMatch))
                } else {
                    debug!(tier = identity.tier().as_str(), bound = %bound, requested = %restaurant_id, "binding mismatch");
                    Ok(Decision::deny(DecisionReason::RestaurantAccessDenied))
                }
            }
            Identity::Persistent { user_id, .. } => {
                match self.memberships.exists(*user_id, restaurant_id).await {
                    Ok(true) => Ok(Decision::allow(DecisionReason::MembershipFound)),
                    Ok(false) => Ok(Decision::deny(DecisionReason::RestaurantAccessDenied)),
                    Err(err) => {
                        warn!(user_id = %user_id, restaurant_id = %restaurant_id, error = %err, "membership lookup failed");
                        Err(SecurityError::MembershipUnavailable(err.to_string()))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use common_auth::Role;

    use super::*;
    use crate::membership::{InMemoryMembershipStore, MembershipError};

    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryMembershipStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MembershipStore for CountingStore {
        async fn exists(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<bool, MembershipError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.exists(user_id, restaurant_id).await
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl MembershipStore for BrokenStore {
        async fn exists(&self, _: Uuid, _: Uuid) -> Result<bool, MembershipError> {
            Err(MembershipError::Unavailable("connection refused".into()))
        }
    }

    fn guest(restaurant_id: Uuid) -> Identity {
        Identity::Ephemeral { subject_id: format!("guest:{}", Uuid::new_v4()), restaurant_id }
    }

    #[tokio::test]
    async fn guest_bound_to_a_cannot_reach_b() {
        let store = Arc::new(CountingStore::default());
        let guard = RestaurantAccessGuard::new(store.clone());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let decision = guard.check_access(&guest(a), b).await.expect("decision");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::RestaurantAccessDenied);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bound_identities_never_touch_the_store() {
        let store = Arc::new(CountingStore::default());
        let guard = RestaurantAccessGuard::new(store.clone());
        let rid = Uuid::new_v4();
        let station = Identity::Station { subject_id: "station:1".into(), role: Role::Kitchen, restaurant_id: rid };

        for identity in [guest(rid), station] {
            let decision = guard.check_access(&identity, rid).await.expect("decision");
            assert!(decision.allowed);
            assert_eq!(decision.reason, DecisionReason::TokenBindingMatch);
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn persistent_needs_membership_row() {
        let store = Arc::new(CountingStore::default());
        let guard = RestaurantAccessGuard::new(store.clone());
        let (user_id, rid) = (Uuid::new_v4(), Uuid::new_v4());
        let manager = Identity::Persistent { user_id, role: Role::Manager, home_restaurant: Some(rid) };

        let denied = guard.check_access(&manager, rid).await.expect("decision");
        assert_eq!(denied.reason, DecisionReason::RestaurantAccessDenied);

        store.inner.grant(user_id, rid).expect("grant");
        let allowed = guard.check_access(&manager, rid).await.expect("decision");
        assert_eq!(allowed.reason, DecisionReason::MembershipFound);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn store_failure_is_not_a_denial() {
        let guard = RestaurantAccessGuard::new(Arc::new(BrokenStore));
        let owner = Identity::Persistent { user_id: Uuid::new_v4(), role: Role::Owner, home_restaurant: None };
        let err = guard.check_access(&owner, Uuid::new_v4()).await.expect_err("unavailable");
        assert!(matches!(err, SecurityError::MembershipUnavailable(_)));
    }
}
