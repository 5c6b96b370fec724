//! Client configuration

use fiet_types::{ErrorKind, Network, Result, Stage, TESTNET_DOMAIN};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::manifest::MANIFEST_TTL;

/// Pricing context sent with every quote request
pub const DEFAULT_QUOTE_CONTEXT: &str = "sep6";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anchor client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Domain used when a request names none
    pub default_domain: String,
    /// Network whose passphrase challenges are signed for
    pub network: Network,
    /// Freshness window of cached manifests
    pub manifest_ttl: Duration,
    /// Per-request timeout of the HTTP client
    pub request_timeout: Duration,
    /// Context sent with quote requests
    pub quote_context: String,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            default_domain: TESTNET_DOMAIN.to_string(),
            network: Network::Testnet,
            manifest_ttl: MANIFEST_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            quote_context: DEFAULT_QUOTE_CONTEXT.to_string(),
        }
    }
}

impl AnchorConfig {
    /// Create a configuration from environment variables
    ///
    /// - `FIET_ANCHOR_DOMAIN`: default anchor domain
    /// - `FIET_NETWORK`: `testnet`, `public`, or a literal passphrase
    /// - `FIET_MANIFEST_TTL_SECS`: manifest cache window
    /// - `FIET_HTTP_TIMEOUT_SECS`: HTTP request timeout
    pub fn from_env() -> Self {
        // Try to load .env file (ignore errors)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(domain) = lookup("FIET_ANCHOR_DOMAIN").filter(|d| !d.trim().is_empty()) {
            config.default_domain = domain.trim().to_string();
        }
        if let Some(network) = lookup("FIET_NETWORK").filter(|n| !n.trim().is_empty()) {
            config.network = Network::from_str(&network);
        }
        if let Some(ttl) = seconds(&lookup, "FIET_MANIFEST_TTL_SECS") {
            config.manifest_ttl = ttl;
        }
        if let Some(timeout) = seconds(&lookup, "FIET_HTTP_TIMEOUT_SECS") {
            config.request_timeout = timeout;
        }

        config
    }

    pub fn with_default_domain(mut self, domain: impl Into<String>) -> Self {
        self.default_domain = domain.into();
        self
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn with_manifest_ttl(mut self, ttl: Duration) -> Self {
        self.manifest_ttl = ttl;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_domain.trim().is_empty() {
            return Err(config_error("default_domain must not be empty"));
        }
        if self.network.passphrase().is_empty() {
            return Err(config_error("network passphrase must not be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(config_error("request_timeout must be positive"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> fiet_types::FietError {
    ErrorKind::Config {
        message: message.to_string(),
    }
    .at(Stage::Local)
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring invalid duration, using default");
            None
        }
    }
}
