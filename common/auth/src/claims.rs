use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credentials::VerifiedCredential;
use crate::error::{AuthError, AuthResult};
use crate::roles::{Role, Tier};

/// Reserved subject prefix for self-service customer sessions. No membership row will
/// ever exist for a subject carrying it.
pub const EPHEMERAL_SUBJECT_PREFIX: &str = "guest:";
pub const STATION_SUBJECT_PREFIX: &str = "station:";

/// Verified, immutable claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityClaim {
    pub subject_id: String,
    pub role: Role,
    pub restaurant_id: Option<Uuid>,
    pub scopes: BTreeSet<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub issuer: String,
    pub audience: Vec<String>,
    pub token_id: Option<String>,
}

impl IdentityClaim {
    pub fn has_ephemeral_subject(&self) -> bool {
        self.subject_id.starts_with(EPHEMERAL_SUBJECT_PREFIX)
    }
}

/// What a caller asks the codec to mint. Persistent tokens can only be requested with
/// a credential that an external check has already accepted.
#[derive(Debug, Clone)]
pub enum ClaimInput {
    Persistent {
        credential: VerifiedCredential,
        restaurant_id: Option<Uuid>,
    },
    Station {
        role: Role,
        restaurant_id: Uuid,
    },
    Ephemeral {
        restaurant_id: Uuid,
    },
}

impl ClaimInput {
    pub fn tier(&self) -> Tier {
        match self {
            ClaimInput::Persistent { .. } => Tier::Persistent,
            ClaimInput::Station { .. } => Tier::Station,
            ClaimInput::Ephemeral { .. } => Tier::Ephemeral,
        }
    }

    /// Subject, role and binding for the token, generating fresh subjects for the
    /// device and guest tiers.
    pub(crate) fn materialize(&self) -> AuthResult<(String, Role, Option<Uuid>)> {
        match self {
            ClaimInput::Persistent { credential, restaurant_id } => {
                if credential.role.tier() != Tier::Persistent {
                    return Err(AuthError::Issuance(format!(
                        "role '{}' cannot hold a persistent token",
                        credential.role
                    )));
                }
                Ok((credential.user_id.to_string(), credential.role, *restaurant_id))
            }
            ClaimInput::Station { role, restaurant_id } => {
                if role.tier() != Tier::Station {
                    return Err(AuthError::Issuance(format!(
                        "role '{role}' cannot hold a station token"
                    )));
                }
                Ok((
                    format!("{STATION_SUBJECT_PREFIX}{}", Uuid::new_v4()),
                    *role,
                    Some(*restaurant_id),
                ))
            }
            ClaimInput::Ephemeral { restaurant_id } => Ok((
                format!("{EPHEMERAL_SUBJECT_PREFIX}{}", Uuid::new_v4()),
                Role::Customer,
                Some(*restaurant_id),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClaimsRepr {
    sub: String,
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rid: Option<String>,
    #[serde(default)]
    scopes: Vec<String>,
    iat: i64,
    exp: i64,
    iss: String,
    #[serde(default)]
    aud: Option<AudienceRepr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

impl From<&IdentityClaim> for ClaimsRepr {
    fn from(claim: &IdentityClaim) -> Self {
        let aud = match claim.audience.as_slice() {
            [single] => Some(AudienceRepr::Single(single.clone())),
            [] => None,
            many => Some(AudienceRepr::Many(many.to_vec())),
        };
        Self {
            sub: claim.subject_id.clone(),
            role: claim.role.as_str().to_string(),
            rid: claim.restaurant_id.map(|id| id.to_string()),
            scopes: claim.scopes.iter().cloned().collect(),
            iat: claim.issued_at.timestamp(),
            exp: claim.expires_at.timestamp(),
            iss: claim.issuer.clone(),
            aud,
            jti: claim.token_id.clone(),
        }
    }
}

impl TryFrom<ClaimsRepr> for IdentityClaim {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        if value.sub.trim().is_empty() {
            return Err(AuthError::InvalidClaim("sub", value.sub));
        }
        let role = value
            .role
            .parse::<Role>()
            .map_err(|_| AuthError::InvalidClaim("role", value.role.clone()))?;
        let restaurant_id = match value.rid {
            Some(raw) => Some(
                Uuid::parse_str(&raw).map_err(|_| AuthError::InvalidClaim("rid", raw.clone()))?,
            ),
            None => None,
        };

        let issued_at = Utc
            .timestamp_opt(value.iat, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidClaim("iat", value.iat.to_string()))?;
        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidClaim("exp", value.exp.to_string()))?;
        if expires_at <= issued_at {
            return Err(AuthError::Malformed("exp must be after iat".into()));
        }

        let audience = match value.aud {
            Some(AudienceRepr::Single(item)) => vec![item],
            Some(AudienceRepr::Many(items)) => items,
            None => Vec::new(),
        };

        Ok(Self {
            subject_id: value.sub,
            role,
            restaurant_id,
            scopes: value.scopes.into_iter().collect(),
            issued_at,
            expires_at,
            issuer: value.iss,
            audience,
            token_id: value.jti,
        })
    }
}
