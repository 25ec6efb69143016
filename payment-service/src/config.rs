use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::warn;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const MIN_TIMEOUT_MS: u64 = 100;
/// API key value that marks the gateway as deliberately not set up.
pub const UNCONFIGURED_SENTINEL: &str = "unconfigured";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayMode {
    /// No processor configured: charges are fabricated and flagged synthetic.
    Bypass,
    Live { base_url: String, api_key: String },
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub gateway: GatewayMode,
    pub timeout: Duration,
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self> {
        let timeout_ms = match env::var("PAYMENT_GATEWAY_TIMEOUT_MS") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .context("PAYMENT_GATEWAY_TIMEOUT_MS must be an integer")?,
            ),
            Err(_) => None,
        };
        Self::from_values(
            env::var("PAYMENT_GATEWAY_URL").ok(),
            env::var("PAYMENT_GATEWAY_API_KEY").ok(),
            timeout_ms,
        )
    }

    pub fn from_values(base_url: Option<String>, api_key: Option<String>, timeout_ms: Option<u64>) -> Result<Self> {
        let timeout = Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS).max(MIN_TIMEOUT_MS));
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != UNCONFIGURED_SENTINEL);

        let gateway = match api_key {
            None => {
                warn!("payment gateway not configured; charges will be synthetic");
                GatewayMode::Bypass
            }
            Some(api_key) => {
                let Some(base_url) = base_url.map(|u| u.trim().trim_end_matches('/').to_string()).filter(|u| !u.is_empty()) else {
                    bail!("PAYMENT_GATEWAY_URL must be set when PAYMENT_GATEWAY_API_KEY is configured");
                };
                GatewayMode::Live { base_url, api_key }
            }
        };
        Ok(Self { gateway, timeout })
    }

    pub fn is_bypass(&self) -> bool {
        self.gateway == GatewayMode::Bypass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_sentinel_key_means_bypass() {
        assert!(PaymentConfig::from_values(None, None, None).unwrap().is_bypass());
        assert!(PaymentConfig::from_values(Some("http://gw".into()), Some("unconfigured".into()), None)
            .unwrap()
            .is_bypass());
        assert!(PaymentConfig::from_values(None, Some("  ".into()), None).unwrap().is_bypass());
    }

    #[test]
    fn live_mode_requires_url() {
        assert!(PaymentConfig::from_values(None, Some("sk_live".into()), None).is_err());
        let cfg = PaymentConfig::from_values(Some("http://gw/".into()), Some("sk_live".into()), None).unwrap();
        assert_eq!(
            cfg.gateway,
            GatewayMode::Live { base_url: "http://gw".into(), api_key: "sk_live".into() }
        );
    }

    #[test]
    fn timeout_defaults_and_floor() {
        assert_eq!(PaymentConfig::from_values(None, None, None).unwrap().timeout, Duration::from_millis(10_000));
        assert_eq!(PaymentConfig::from_values(None, None, Some(5)).unwrap().timeout, Duration::from_millis(100));
    }
}
