use std::env;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Customer self-service sessions can be switched off per deployment.
    pub guest_sessions_enabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { guest_sessions_enabled: true }
    }
}

pub fn load_auth_config() -> AuthConfig {
    AuthConfig {
        guest_sessions_enabled: bool_from_env("AUTH_GUEST_SESSIONS_ENABLED").unwrap_or(true),
    }
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| parse_bool(&value))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_truthy_values() {
        for value in ["1", "true", "YES", " on "] {
            assert!(parse_bool(value), "{value} should be truthy");
        }
        for value in ["0", "false", "off", ""] {
            assert!(!parse_bool(value), "{value} should be falsy");
        }
    }

    #[test]
    fn guest_sessions_default_on() {
        assert!(AuthConfig::default().guest_sessions_enabled);
    }
}
