//! Anchor manifest: the per-domain document listing service endpoints

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{ErrorKind, Result, Stage};

/// Well-known manifest keys consumed by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestField {
    /// SEP-10 authentication endpoint
    WebAuthEndpoint,
    /// SEP-24 interactive transfer server
    TransferServerSep24,
    /// SEP-38 quote server
    QuoteServer,
    /// Anchor's signing key
    SigningKey,
    /// Ledger network passphrase the anchor operates on
    NetworkPassphrase,
}

impl ManifestField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::WebAuthEndpoint => "WEB_AUTH_ENDPOINT",
            Self::TransferServerSep24 => "TRANSFER_SERVER_SEP0024",
            Self::QuoteServer => "ANCHOR_QUOTE_SERVER",
            Self::SigningKey => "SIGNING_KEY",
            Self::NetworkPassphrase => "NETWORK_PASSPHRASE",
        }
    }
}

impl fmt::Display for ManifestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Resolved manifest of one anchor domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorManifest {
    pub domain: String,
    entries: BTreeMap<String, String>,
}

impl AnchorManifest {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build from raw key/value pairs
    pub fn from_entries<I, K, V>(domain: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            domain: domain.into(),
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with(mut self, field: ManifestField, value: impl Into<String>) -> Self {
        self.entries.insert(field.key().to_string(), value.into());
        self
    }

    /// Look up a raw key
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Look up a well-known field; empty values count as absent
    pub fn get(&self, field: ManifestField) -> Option<&str> {
        self.get_raw(field.key())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Look up a field a dependent component cannot work without
    pub fn require(&self, field: ManifestField) -> Result<&str> {
        self.get(field).ok_or_else(|| {
            ErrorKind::ManifestFieldMissing {
                domain: self.domain.clone(),
                field: field.key(),
            }
            .at(Stage::Manifest)
        })
    }

    /// Require an endpoint, trimmed of any trailing slash
    pub fn endpoint(&self, field: ManifestField) -> Result<&str> {
        self.require(field).map(|url| url.trim_end_matches('/'))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
