//! Anchor client facade
//!
//! [`AnchorClient`] wires one shared [`ManifestResolver`] into the
//! authentication, transfer and quote components, then runs each operation
//! as a handshake followed by the authenticated request.

use fiet_crypto::ChallengeSigner;
use fiet_types::{
    AuthToken, InteractiveSession, QuoteRequest, QuoteResult, Result, TransferRequest,
};
use std::sync::Arc;

use crate::auth::AuthSession;
use crate::config::AnchorConfig;
use crate::manifest::{ManifestFetcher, ManifestResolver, WellKnownFetcher};
use crate::quote::QuoteCatalog;
use crate::transfer::AssetCatalog;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Entry point for anchor operations
pub struct AnchorClient {
    config: AnchorConfig,
    resolver: Arc<ManifestResolver>,
    auth: AuthSession,
    transfers: AssetCatalog,
    quotes: QuoteCatalog,
}

impl AnchorClient {
    /// Client over HTTPS with the given configuration
    pub fn new(config: AnchorConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Client configured from `FIET_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(AnchorConfig::from_env())
    }

    pub fn builder(config: AnchorConfig) -> AnchorClientBuilder {
        AnchorClientBuilder::new(config)
    }

    /// Authenticate `signer` with the anchor at `domain` (or the default)
    pub async fn authenticate(
        &self,
        signer: &dyn ChallengeSigner,
        domain: Option<&str>,
    ) -> Result<AuthToken> {
        self.auth.get_auth_token(signer, domain).await
    }

    /// Authenticate, validate and start an interactive deposit
    pub async fn deposit(
        &self,
        signer: &dyn ChallengeSigner,
        request: &TransferRequest,
    ) -> Result<InteractiveSession> {
        let token = self.authenticate(signer, request.domain.as_deref()).await?;
        self.transfers.perform_deposit(request, &token).await
    }

    /// Authenticate, validate and start an interactive withdrawal
    pub async fn withdraw(
        &self,
        signer: &dyn ChallengeSigner,
        request: &TransferRequest,
    ) -> Result<InteractiveSession> {
        let token = self.authenticate(signer, request.domain.as_deref()).await?;
        self.transfers.perform_withdraw(request, &token).await
    }

    /// Authenticate and fetch an indicative price
    pub async fn quote(
        &self,
        signer: &dyn ChallengeSigner,
        request: &QuoteRequest,
    ) -> Result<QuoteResult> {
        let token = self.authenticate(signer, request.domain.as_deref()).await?;
        self.quotes.get_quote(request, &token).await
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn transfers(&self) -> &AssetCatalog {
        &self.transfers
    }

    pub fn quotes(&self) -> &QuoteCatalog {
        &self.quotes
    }

    pub fn resolver(&self) -> &Arc<ManifestResolver> {
        &self.resolver
    }

    pub fn config(&self) -> &AnchorConfig {
        &self.config
    }
}

/// Builder for an anchor client with injected collaborators
pub struct AnchorClientBuilder {
    config: AnchorConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    fetcher: Option<Arc<dyn ManifestFetcher>>,
}

impl AnchorClientBuilder {
    pub fn new(config: AnchorConfig) -> Self {
        Self {
            config,
            transport: None,
            fetcher: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Manifest source; defaults to the well-known document over the transport
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ManifestFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn build(self) -> Result<AnchorClient> {
        let config = self.config;
        config.validate()?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(config.request_timeout)?),
        };
        let fetcher: Arc<dyn ManifestFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(WellKnownFetcher::new(transport.clone())),
        };
        let resolver = Arc::new(ManifestResolver::with_ttl(fetcher, config.manifest_ttl));

        let auth = AuthSession::new(
            resolver.clone(),
            transport.clone(),
            config.network.clone(),
            config.default_domain.clone(),
        );
        let transfers = AssetCatalog::new(
            resolver.clone(),
            transport.clone(),
            config.default_domain.clone(),
        );
        let quotes = QuoteCatalog::new(resolver.clone(), transport, config.default_domain.clone())
            .with_context(config.quote_context.clone());

        tracing::debug!(
            domain = %config.default_domain,
            network = %config.network,
            "anchor client ready"
        );

        Ok(AnchorClient {
            config,
            resolver,
            auth,
            transfers,
            quotes,
        })
    }
}
