//! Indicative prices between anchor assets

use fiet_types::{
    AssetId, AuthToken, ErrorKind, FietError, ManifestField, QuoteRequest, QuoteResult, Result,
    Stage,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::DEFAULT_QUOTE_CONTEXT;
use crate::manifest::{domain_key, ManifestResolver};
use crate::once::KeyedLoadOnce;
use crate::transport::{HttpRequest, HttpTransport};

#[derive(Debug, Deserialize)]
struct QuoteInfoResponse {
    #[serde(default)]
    assets: Vec<QuoteAssetEntry>,
}

#[derive(Debug, Deserialize)]
struct QuoteAssetEntry {
    asset: String,
}

/// Short asset code to fully-qualified identifier
///
/// Codes collide across schemes and issuers; the entry listed last wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetRegistry {
    assets: BTreeMap<String, AssetId>,
}

impl AssetRegistry {
    pub fn from_json(body: &str) -> Result<Self> {
        let info: QuoteInfoResponse = serde_json::from_str(body).map_err(|e| {
            FietError::invalid_response(Stage::QuoteInfo, format!("malformed info response: {e}"))
        })?;

        let mut registry = Self::default();
        for entry in info.assets {
            match AssetId::parse(entry.asset.trim()) {
                Some(id) => registry.insert(id),
                None => tracing::warn!(asset = %entry.asset, "skipping unparseable asset identifier"),
            }
        }

        if registry.is_empty() {
            return Err(FietError::invalid_response(
                Stage::QuoteInfo,
                "info response lists no assets",
            ));
        }
        Ok(registry)
    }

    pub fn insert(&mut self, id: AssetId) {
        let code = id.code().to_string();
        if let Some(previous) = self.assets.insert(code.clone(), id) {
            tracing::warn!(code = %code, replaced = %previous, "quote asset code collision");
        }
    }

    /// Exact, case-sensitive lookup
    pub fn resolve(&self, code: &str) -> Option<&AssetId> {
        self.assets.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn require(&self, code: &str) -> Result<&AssetId> {
        self.resolve(code).ok_or_else(|| {
            ErrorKind::AssetUnknown {
                code: code.to_string(),
            }
            .at(Stage::Quote)
        })
    }
}

/// Quote-side asset registries and price lookups, one registry per domain
pub struct QuoteCatalog {
    resolver: Arc<ManifestResolver>,
    transport: Arc<dyn HttpTransport>,
    default_domain: String,
    context: String,
    registries: KeyedLoadOnce<AssetRegistry>,
}

impl QuoteCatalog {
    pub fn new(
        resolver: Arc<ManifestResolver>,
        transport: Arc<dyn HttpTransport>,
        default_domain: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            transport,
            default_domain: default_domain.into(),
            context: DEFAULT_QUOTE_CONTEXT.to_string(),
            registries: KeyedLoadOnce::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    fn domain<'a>(&'a self, domain: Option<&'a str>) -> &'a str {
        domain.unwrap_or(&self.default_domain)
    }

    async fn endpoint(&self, domain: &str) -> Result<String> {
        self.resolver
            .endpoint(domain, ManifestField::QuoteServer)
            .await
    }

    /// Load the asset registry of `domain` (or the default) unless already loaded
    pub async fn init(&self, domain: Option<&str>) -> Result<()> {
        let domain = self.domain(domain);
        let endpoint = self
            .endpoint(domain)
            .await
            .map_err(|e| e.in_stage(Stage::QuoteInfo))?;
        self.ensure_loaded(domain, &endpoint).await.map(|_| ())
    }

    pub fn is_loaded(&self, domain: Option<&str>) -> bool {
        self.registries.is_loaded(&domain_key(self.domain(domain)))
    }

    /// Forget every loaded registry
    pub fn reset(&self) {
        self.registries.clear();
    }

    pub fn reset_domain(&self, domain: &str) {
        self.registries.remove(&domain_key(domain));
    }

    /// Identifier registered for `code` at `domain`, if loaded
    pub fn resolve_asset(&self, code: &str, domain: Option<&str>) -> Option<AssetId> {
        self.assets(domain)?.resolve(code).cloned()
    }

    /// Snapshot of the loaded registry of `domain`
    pub fn assets(&self, domain: Option<&str>) -> Option<Arc<AssetRegistry>> {
        self.registries.get(&domain_key(self.domain(domain)))
    }

    async fn ensure_loaded(&self, domain: &str, endpoint: &str) -> Result<Arc<AssetRegistry>> {
        self.registries
            .get_or_load(&domain_key(domain), || self.load(endpoint))
            .await
            .map_err(|e| e.in_stage(Stage::QuoteInfo))
    }

    async fn load(&self, endpoint: &str) -> Result<AssetRegistry> {
        let url = format!("{endpoint}/info");
        let response = self
            .transport
            .send(HttpRequest::get(&url))
            .await
            .map_err(|e| e.at(Stage::QuoteInfo))?
            .require_success(Stage::QuoteInfo)?;

        let registry = AssetRegistry::from_json(&response.body)?;
        tracing::debug!(url = %url, assets = registry.len(), "loaded quote assets");
        Ok(registry)
    }

    /// Indicative price for selling `sell_amount` of one asset for another
    pub async fn get_quote(&self, request: &QuoteRequest, token: &AuthToken) -> Result<QuoteResult> {
        self.price(request, token)
            .await
            .map_err(|e| e.in_stage(Stage::Quote))
    }

    async fn price(&self, request: &QuoteRequest, token: &AuthToken) -> Result<QuoteResult> {
        let domain = self.domain(request.domain.as_deref());
        let endpoint = self.endpoint(domain).await?;
        let registry = self.ensure_loaded(domain, &endpoint).await?;

        let sell = registry.require(&request.sell_code)?;
        let buy = registry.require(&request.buy_code)?;

        let http = HttpRequest::get(format!("{endpoint}/price"))
            .query("sell_asset", sell.as_str())
            .query("buy_asset", buy.as_str())
            .query("sell_amount", request.sell_amount.to_string())
            .query("context", self.context.as_str())
            .bearer(token.bearer());

        let response = self
            .transport
            .send(http)
            .await
            .map_err(|e| e.at(Stage::Quote))?
            .require_success(Stage::Quote)?;

        let quote: QuoteResult = response.json(Stage::Quote)?;
        tracing::debug!(sell = %sell, buy = %buy, price = %quote.price, "received quote");
        Ok(quote)
    }
}
