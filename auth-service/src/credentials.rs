use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use common_auth::{CredentialError, CredentialVerifier, Role, Tier, VerifiedCredential};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct CredentialRow {
    id: Uuid,
    role: String,
    password_hash: String,
    active: bool,
}

/// Staff credentials stored in the `users` table as argon2 PHC strings.
#[derive(Clone)]
pub struct PgCredentialVerifier {
    pool: PgPool,
}

impl PgCredentialVerifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialVerifier for PgCredentialVerifier {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedCredential>, CredentialError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, role, password_hash, active FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| CredentialError::Unavailable(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        if !row.active {
            return Ok(None);
        }

        let parsed = PasswordHash::new(&row.password_hash).map_err(|err| {
            warn!(user_id = %row.id, error = %err, "stored password hash does not parse");
            CredentialError::Corrupt(row.id)
        })?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Ok(None);
        }

        let role = row
            .role
            .parse::<Role>()
            .ok()
            .filter(|role| role.tier() == Tier::Persistent)
            .ok_or_else(|| {
                warn!(user_id = %row.id, role = %row.role, "stored role cannot hold a staff login");
                CredentialError::Corrupt(row.id)
            })?;

        Ok(Some(VerifiedCredential { user_id: row.id, role }))
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("correct horse").expect("hash");
        let parsed = PasswordHash::new(&hash).expect("phc string");
        assert!(Argon2::default().verify_password(b"correct horse", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("same").expect("hash");
        let second = hash_password("same").expect("hash");
        assert_ne!(first, second);
    }
}
