pub mod access;
pub mod authorizer;
pub mod context;
pub mod decision;
pub mod error;
pub mod identity;
pub mod membership;
pub mod scopes;
pub mod tenancy;
pub mod test_macros;

pub use access::RestaurantAccessGuard;
pub use authorizer::RoleAuthorizer;
pub use context::{AccessControl, SecurityContext, RESTAURANT_HEADER, TRACE_HEADER};
pub use decision::{Decision, DecisionReason};
pub use error::SecurityError;
pub use identity::{Identity, IdentityError, IdentityResolver};
pub use membership::{InMemoryMembershipStore, MembershipError, MembershipStore, PgMembershipStore};
pub use scopes::{scope, ScopeRegistry, ScopeRegistryError};
