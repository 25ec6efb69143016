use axum::extract::State;
use axum::Json;
use common_auth::{AuthContext, ClaimInput, IdentityClaim, Role, Tier};
use common_http_errors::ApiResult;
use common_security::{scope, Identity, IdentityResolver, SecurityContext};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::SessionError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub restaurant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSessionRequest {
    pub restaurant_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StationTokenRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub role: Role,
    pub tier: Tier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub claim: IdentityClaim,
    pub identity: Identity,
}

impl AppState {
    /// Mints a token whose scopes come from the registry for the role, never from the
    /// request.
    fn issue(&self, input: ClaimInput, role: Role) -> Result<TokenResponse, SessionError> {
        let scopes = self.access.registry().scopes_for(role);
        let issued = self.access.codec().issue(&input, scopes)?;
        let tier = input.tier();
        self.metrics.token_issued(tier.as_str());
        info!(
            tier = tier.as_str(),
            role = issued.claim.role.as_str(),
            restaurant_id = ?issued.claim.restaurant_id,
            "token issued"
        );
        Ok(TokenResponse {
            expires_in: issued.expires_in(),
            role: issued.claim.role,
            tier,
            restaurant_id: issued.claim.restaurant_id,
            access_token: issued.token,
            token_type: "Bearer",
        })
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(login_inner(&state, request).await?))
}

async fn login_inner(state: &AppState, request: LoginRequest) -> Result<TokenResponse, SessionError> {
    let LoginRequest { email, password, restaurant_id } = request;
    let credential = state
        .credentials
        .verify(&email, &password)
        .await?
        .ok_or(SessionError::InvalidCredentials)?;

    if let Some(restaurant_id) = restaurant_id {
        if !state.memberships.exists(credential.user_id, restaurant_id).await? {
            warn!(user_id = %credential.user_id, %restaurant_id, "login for restaurant without membership");
            return Err(SessionError::RestaurantAccessDenied);
        }
    }

    let role = credential.role;
    state.issue(ClaimInput::Persistent { credential, restaurant_id }, role)
}

pub async fn create_guest_session(
    State(state): State<AppState>,
    Json(request): Json<GuestSessionRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if !state.config.guest_sessions_enabled {
        return Err(SessionError::GuestSessionsDisabled.into());
    }
    let response = state.issue(
        ClaimInput::Ephemeral { restaurant_id: request.restaurant_id },
        Role::Customer,
    )?;
    Ok(Json(response))
}

pub async fn issue_station_token(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Json(request): Json<StationTokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    ctx.require(&[scope::STATIONS_ISSUE])?;
    if request.role.tier() != Tier::Station {
        return Err(SessionError::InvalidStationRole(request.role).into_api_error(Some(ctx.trace_id)));
    }
    let response = state
        .issue(
            ClaimInput::Station { role: request.role, restaurant_id: ctx.restaurant_id },
            request.role,
        )
        .map_err(|err| err.into_api_error(Some(ctx.trace_id)))?;
    Ok(Json(response))
}

pub async fn current_session(auth: AuthContext) -> ApiResult<Json<SessionView>> {
    let claim = auth.into_claim();
    let identity = IdentityResolver.resolve(&claim).map_err(SessionError::from)?;
    Ok(Json(SessionView { claim, identity }))
}
