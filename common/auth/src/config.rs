use std::env;

use anyhow::{Context, Result};
use chrono::Duration;

use crate::roles::Tier;

pub const DEFAULT_PERSISTENT_TTL_SECONDS: i64 = 8 * 60 * 60;
pub const DEFAULT_STATION_TTL_SECONDS: i64 = 12 * 60 * 60;
pub const DEFAULT_EPHEMERAL_TTL_SECONDS: i64 = 60 * 60;

/// Runtime configuration for issuing and verifying tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Expected issuer claim (iss).
    pub issuer: String,
    /// Expected audience claim (aud).
    pub audience: String,
    /// Allowable clock skew in seconds when validating exp. Zero means a token is
    /// rejected the second it expires.
    pub leeway_seconds: u32,
    pub persistent_ttl_seconds: i64,
    pub station_ttl_seconds: i64,
    pub ephemeral_ttl_seconds: i64,
}

impl TokenConfig {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_seconds: 0,
            persistent_ttl_seconds: DEFAULT_PERSISTENT_TTL_SECONDS,
            station_ttl_seconds: DEFAULT_STATION_TTL_SECONDS,
            ephemeral_ttl_seconds: DEFAULT_EPHEMERAL_TTL_SECONDS,
        }
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_ttl(mut self, tier: Tier, seconds: i64) -> Self {
        match tier {
            Tier::Persistent => self.persistent_ttl_seconds = seconds,
            Tier::Station => self.station_ttl_seconds = seconds,
            Tier::Ephemeral => self.ephemeral_ttl_seconds = seconds,
        }
        self
    }

    pub fn ttl_for(&self, tier: Tier) -> Duration {
        let seconds = match tier {
            Tier::Persistent => self.persistent_ttl_seconds,
            Tier::Station => self.station_ttl_seconds,
            Tier::Ephemeral => self.ephemeral_ttl_seconds,
        };
        Duration::seconds(seconds)
    }

    pub fn from_env() -> Result<Self> {
        let issuer = env::var("TOKEN_ISSUER").context("TOKEN_ISSUER must be set")?;
        let audience = env::var("TOKEN_AUDIENCE").context("TOKEN_AUDIENCE must be set")?;

        let mut config = Self::new(issuer, audience);
        if let Some(leeway) = parse_env::<u32>("TOKEN_LEEWAY_SECONDS")? {
            config = config.with_leeway(leeway);
        }
        for (key, tier) in [
            ("TOKEN_TTL_PERSISTENT_SECONDS", Tier::Persistent),
            ("TOKEN_TTL_STATION_SECONDS", Tier::Station),
            ("TOKEN_TTL_EPHEMERAL_SECONDS", Tier::Ephemeral),
        ] {
            if let Some(seconds) = parse_env::<i64>(key)? {
                anyhow::ensure!(seconds > 0, "{key} must be positive");
                config = config.with_ttl(tier, seconds);
            }
        }
        Ok(config)
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} is not a valid number")),
        _ => Ok(None),
    }
}
