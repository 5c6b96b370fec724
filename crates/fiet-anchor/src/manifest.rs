//! Manifest resolution with a shared, per-domain cache
//!
//! One [`ManifestResolver`] is shared by every component of a client. Each
//! domain owns an async slot: concurrent resolves of the same domain wait on
//! one fetch, and different domains never block each other.

use async_trait::async_trait;
use fiet_types::{AnchorManifest, ErrorKind, ManifestField, Result, Stage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::transport::{HttpRequest, HttpTransport};

/// Freshness window of a cached manifest
pub const MANIFEST_TTL: Duration = Duration::from_secs(60 * 60);

/// Path of the manifest document below an anchor's origin
pub const WELL_KNOWN_PATH: &str = "/.well-known/stellar.toml";

/// Source of manifest documents
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<AnchorManifest>;
}

// ============================================================================
// Well-known fetcher
// ============================================================================

/// Fetches `https://{domain}/.well-known/stellar.toml`
pub struct WellKnownFetcher {
    transport: Arc<dyn HttpTransport>,
}

impl WellKnownFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Manifest URL for a bare domain or an origin with scheme
    pub fn manifest_url(domain: &str) -> String {
        let domain = domain.trim().trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            format!("{domain}{WELL_KNOWN_PATH}")
        } else {
            format!("https://{domain}{WELL_KNOWN_PATH}")
        }
    }
}

fn unavailable(domain: &str, message: impl Into<String>) -> fiet_types::FietError {
    ErrorKind::ManifestUnavailable {
        domain: domain.to_string(),
        message: message.into(),
    }
    .at(Stage::Manifest)
}

/// Parse a manifest document, keeping top-level string entries
pub fn parse_manifest(domain: &str, document: &str) -> Result<AnchorManifest> {
    let table: toml::Table = document
        .parse()
        .map_err(|e: toml::de::Error| unavailable(domain, format!("invalid TOML: {}", e.message())))?;

    let entries = table.into_iter().filter_map(|(key, value)| match value {
        toml::Value::String(s) => Some((key, s)),
        _ => None,
    });

    Ok(AnchorManifest::from_entries(domain, entries))
}

#[async_trait]
impl ManifestFetcher for WellKnownFetcher {
    async fn fetch(&self, domain: &str) -> Result<AnchorManifest> {
        let url = Self::manifest_url(domain);
        let response = self
            .transport
            .send(HttpRequest::get(&url))
            .await
            .map_err(|e| unavailable(domain, e.to_string()))?;

        if !response.is_success() {
            return Err(unavailable(
                domain,
                format!("{url} returned HTTP {}", response.status),
            ));
        }

        parse_manifest(domain, &response.body)
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// A manifest and when it was fetched
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub manifest: Arc<AnchorManifest>,
    pub fetched_at: Instant,
}

impl CacheEntry {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

type Slot = Arc<tokio::sync::Mutex<Option<CacheEntry>>>;

/// Resolves and caches anchor manifests, keyed by domain
pub struct ManifestResolver {
    fetcher: Arc<dyn ManifestFetcher>,
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

/// Normalized form of a domain used as a cache key
pub fn domain_key(domain: &str) -> String {
    domain.trim().trim_end_matches('/').to_lowercase()
}

impl ManifestResolver {
    pub fn new(fetcher: Arc<dyn ManifestFetcher>) -> Self {
        Self::with_ttl(fetcher, MANIFEST_TTL)
    }

    pub fn with_ttl(fetcher: Arc<dyn ManifestFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn slot(&self, key: &str) -> Slot {
        self.slots
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Manifest for `domain`, fetched at most once per freshness window
    pub async fn resolve(&self, domain: &str) -> Result<Arc<AnchorManifest>> {
        let key = domain_key(domain);
        if key.is_empty() {
            return Err(ErrorKind::Config {
                message: "anchor domain is empty".to_string(),
            }
            .at(Stage::Manifest));
        }

        let slot = self.slot(&key);
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref().filter(|e| e.is_fresh(self.ttl)) {
            tracing::debug!(domain = %key, "manifest cache hit");
            return Ok(cached.manifest.clone());
        }

        tracing::debug!(domain = %key, "fetching manifest");
        let manifest = Arc::new(self.fetcher.fetch(&key).await?);
        *entry = Some(CacheEntry {
            manifest: manifest.clone(),
            fetched_at: Instant::now(),
        });

        Ok(manifest)
    }

    /// Resolve `domain` and extract a required endpoint
    pub async fn endpoint(&self, domain: &str, field: ManifestField) -> Result<String> {
        let manifest = self.resolve(domain).await?;
        manifest.endpoint(field).map(str::to_string)
    }

    /// Cached entry for `domain`, fresh or not
    pub async fn cached(&self, domain: &str) -> Option<CacheEntry> {
        let slot = self.slots.lock().get(&domain_key(domain)).cloned()?;
        let entry = slot.lock().await;
        entry.clone()
    }

    /// Drop the cached manifest for `domain`
    pub fn invalidate(&self, domain: &str) {
        self.slots.lock().remove(&domain_key(domain));
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}
