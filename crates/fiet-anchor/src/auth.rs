//! Challenge/response authentication against an anchor's web-auth endpoint

use fiet_crypto::ChallengeSigner;
use fiet_types::{
    AnchorManifest, AuthToken, ChallengeTransaction, ErrorKind, ManifestField, Network, Result,
    Stage,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::manifest::ManifestResolver;
use crate::transport::{HttpRequest, HttpTransport};

#[derive(Deserialize)]
struct ChallengeResponse {
    transaction: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Runs the authentication handshake and yields bearer tokens
pub struct AuthSession {
    resolver: Arc<ManifestResolver>,
    transport: Arc<dyn HttpTransport>,
    network: Network,
    default_domain: String,
}

impl AuthSession {
    pub fn new(
        resolver: Arc<ManifestResolver>,
        transport: Arc<dyn HttpTransport>,
        network: Network,
        default_domain: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            transport,
            network,
            default_domain: default_domain.into(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Obtain a token for `signer`'s account at `domain` (or the default)
    ///
    /// A fresh challenge is requested on every call; nothing is retried.
    pub async fn get_auth_token(
        &self,
        signer: &dyn ChallengeSigner,
        domain: Option<&str>,
    ) -> Result<AuthToken> {
        self.handshake(signer, domain.unwrap_or(&self.default_domain))
            .await
            .map_err(|e| e.in_stage(Stage::Authentication))
    }

    async fn handshake(&self, signer: &dyn ChallengeSigner, domain: &str) -> Result<AuthToken> {
        let manifest = self.resolver.resolve(domain).await?;
        let endpoint = manifest.endpoint(ManifestField::WebAuthEndpoint)?;
        self.check_published_network(&manifest);
        let account = signer.public_address();

        let challenge = self.request_challenge(endpoint, &account).await?;
        let signed = signer.sign_challenge(&challenge, self.network.passphrase())?;
        let token = self.submit_challenge(endpoint, signed).await?;

        tracing::info!(domain, account = %account, "authenticated with anchor");
        Ok(AuthToken::new(token, account))
    }

    /// Whether the manifest names a different network than the configured one
    ///
    /// A mismatch is logged; challenges are still signed for the configured
    /// network.
    fn check_published_network(&self, manifest: &AnchorManifest) -> bool {
        match manifest.get(ManifestField::NetworkPassphrase) {
            Some(published) if published != self.network.passphrase() => {
                tracing::warn!(
                    domain = %manifest.domain,
                    published,
                    configured = self.network.passphrase(),
                    "anchor publishes a different network passphrase"
                );
                true
            }
            _ => false,
        }
    }

    async fn request_challenge(&self, endpoint: &str, account: &str) -> Result<ChallengeTransaction> {
        let request = HttpRequest::get(endpoint).query("account", account);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| e.at(Stage::Authentication))?;

        if !response.is_success() {
            return Err(ErrorKind::ChallengeRejected {
                status: response.status,
                message: response.error_message(),
            }
            .at(Stage::Authentication));
        }

        let body: ChallengeResponse = response.json(Stage::Authentication)?;
        body.transaction
            .filter(|t| !t.is_empty())
            .map(ChallengeTransaction::new)
            .ok_or_else(|| {
                fiet_types::FietError::invalid_response(
                    Stage::Authentication,
                    "challenge response has no transaction",
                )
            })
    }

    async fn submit_challenge(&self, endpoint: &str, signed: String) -> Result<String> {
        let request = HttpRequest::post(endpoint, json!({ "transaction": signed }));
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| e.at(Stage::Authentication))?;

        if !response.is_success() {
            return Err(ErrorKind::AuthenticationFailure {
                status: Some(response.status),
                message: response.error_message(),
            }
            .at(Stage::Authentication));
        }

        let no_token = |message: String| {
            ErrorKind::AuthenticationFailure {
                status: Some(response.status),
                message,
            }
            .at(Stage::Authentication)
        };

        let body: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| no_token(format!("anchor returned no usable token: {e}")))?;
        body.token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| no_token("anchor returned no token".to_string()))
    }
}
