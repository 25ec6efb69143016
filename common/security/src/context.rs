use std::fmt;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};
use common_auth::{bearer_from_headers, IdentityClaim, TokenCodec};
use common_http_errors::ApiError;
use common_observability::PlatformMetrics;
use tracing::{debug, warn, Span};
use uuid::Uuid;

use crate::access::RestaurantAccessGuard;
use crate::authorizer::RoleAuthorizer;
use crate::error::SecurityError;
use crate::identity::{Identity, IdentityResolver};
use crate::membership::MembershipStore;
use crate::scopes::ScopeRegistry;

pub const RESTAURANT_HEADER: &str = "X-Restaurant-ID";
pub const TRACE_HEADER: &str = "X-Trace-ID";

/// Everything a request needs to pass through before a handler runs: token
/// verification, tier resolution, the restaurant check and, per route, the scope check.
pub struct AccessControl {
    codec: Arc<TokenCodec>,
    resolver: IdentityResolver,
    guard: RestaurantAccessGuard,
    authorizer: RoleAuthorizer,
    metrics: Arc<PlatformMetrics>,
}

impl AccessControl {
    pub fn new(
        codec: Arc<TokenCodec>,
        memberships: Arc<dyn MembershipStore>,
        registry: Arc<ScopeRegistry>,
        metrics: Arc<PlatformMetrics>,
    ) -> Self {
        Self {
            codec,
            resolver: IdentityResolver,
            guard: RestaurantAccessGuard::new(memberships),
            authorizer: RoleAuthorizer::new(registry),
            metrics,
        }
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn registry(&self) -> &ScopeRegistry {
        self.authorizer.registry()
    }

    /// Verifies the bearer token and admits the caller to the restaurant named in
    /// `X-Restaurant-ID`.
    pub async fn admit(self: &Arc<Self>, headers: &HeaderMap) -> Result<SecurityContext, SecurityError> {
        let token = bearer_from_headers(headers)?;
        let claim = self.codec.verify(&token)?;
        let identity = self.resolver.resolve(&claim)?;
        let restaurant_id = restaurant_from_headers(headers)?;

        let decision = self.guard.check_access(&identity, restaurant_id).await?;
        let tier = identity.tier().as_str();
        if !decision.allowed {
            self.metrics.access_decision(tier, "denied");
            warn!(%restaurant_id, tier, role = identity.role().as_str(), reason = decision.reason.as_str(), "access denied");
            return Err(SecurityError::RestaurantAccessDenied);
        }
        self.metrics.access_decision(tier, "allowed");
        debug!(%restaurant_id, tier, role = identity.role().as_str(), reason = decision.reason.as_str(), "access allowed");

        Ok(SecurityContext {
            claim,
            identity,
            restaurant_id,
            trace_id: trace_from_headers(headers).unwrap_or_else(Uuid::new_v4),
            access: Arc::clone(self),
        })
    }
}

/// Admitted caller for one request.
#[derive(Clone)]
pub struct SecurityContext {
    pub claim: IdentityClaim,
    pub identity: Identity,
    pub restaurant_id: Uuid,
    pub trace_id: Uuid,
    access: Arc<AccessControl>,
}

impl SecurityContext {
    pub fn allows(&self, required: &[&str]) -> bool {
        self.access.authorizer.authorize(&self.identity, required).allowed
    }

    /// Rejects with 403 `insufficient_scope` naming the first scope the role lacks.
    pub fn require(&self, required: &[&str]) -> Result<(), ApiError> {
        let decision = self.access.authorizer.authorize(&self.identity, required);
        let tier = self.identity.tier().as_str();
        if decision.allowed {
            return Ok(());
        }
        self.access.metrics.access_decision(tier, "scope_denied");
        let scope = decision.missing_scopes.into_iter().next().unwrap_or_default();
        warn!(
            restaurant_id = %self.restaurant_id,
            tier,
            role = self.identity.role().as_str(),
            reason = decision.reason.as_str(),
            missing_scope = %scope,
            "scope check failed"
        );
        Err(SecurityError::InsufficientScope { scope }.into_api_error(Some(self.trace_id)))
    }

    pub fn subject_id(&self) -> String {
        self.identity.subject_id()
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("identity", &self.identity)
            .field("restaurant_id", &self.restaurant_id)
            .field("trace_id", &self.trace_id)
            .finish()
    }
}

fn restaurant_from_headers(headers: &HeaderMap) -> Result<Uuid, SecurityError> {
    let raw = headers
        .get(RESTAURANT_HEADER)
        .ok_or(SecurityError::MissingRestaurant)?
        .to_str()
        .map_err(|_| SecurityError::InvalidRestaurant)?;
    Uuid::parse_str(raw.trim()).map_err(|_| SecurityError::InvalidRestaurant)
}

fn trace_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for SecurityContext
where
    Arc<AccessControl>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let access = Arc::<AccessControl>::from_ref(state);
        let trace_id = trace_from_headers(&parts.headers);
        let ctx = access
            .admit(&parts.headers)
            .await
            .map_err(|err| err.into_api_error(trace_id))?;

        let span = Span::current();
        span.record("restaurant_id", tracing::field::display(ctx.restaurant_id));
        span.record("trace_id", tracing::field::display(ctx.trace_id));
        Ok(ctx)
    }
}
