//! Ledger networks and their passphrases

use serde::{Deserialize, Serialize};
use std::fmt;

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Default anchor used when no domain is given
pub const TESTNET_DOMAIN: &str = "testanchor.stellar.org";

/// Network a challenge transaction is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Testnet,
    Public,
    Custom(String),
}

impl Network {
    pub fn passphrase(&self) -> &str {
        match self {
            Self::Testnet => TESTNET_PASSPHRASE,
            Self::Public => PUBLIC_PASSPHRASE,
            Self::Custom(passphrase) => passphrase,
        }
    }

    /// `testnet`, `public`/`mainnet`, or a literal passphrase
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "testnet" | "test" => Self::Testnet,
            "public" | "pubnet" | "mainnet" => Self::Public,
            _ if s.trim() == TESTNET_PASSPHRASE => Self::Testnet,
            _ if s.trim() == PUBLIC_PASSPHRASE => Self::Public,
            _ => Self::Custom(s.trim().to_string()),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::Testnet
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Testnet => write!(f, "testnet"),
            Self::Public => write!(f, "public"),
            Self::Custom(passphrase) => write!(f, "custom({passphrase})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!(Network::from_str("testnet"), Network::Testnet);
        assert_eq!(Network::from_str("MAINNET"), Network::Public);
        assert_eq!(Network::from_str(PUBLIC_PASSPHRASE), Network::Public);
        assert_eq!(
            Network::from_str("Standalone Network ; February 2017").passphrase(),
            "Standalone Network ; February 2017"
        );
    }
}
