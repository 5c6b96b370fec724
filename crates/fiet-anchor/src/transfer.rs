//! Interactive transfers: capability info, amount validation, session start

use fiet_types::{
    normalize_code, AmountConstraint, AssetDescriptor, AuthToken, ErrorKind, InteractiveSession,
    ManifestField, Operation, Result, Stage, TransferRequest,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::manifest::{domain_key, ManifestResolver};
use crate::once::KeyedLoadOnce;
use crate::transport::{HttpRequest, HttpTransport};

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct TransferInfoResponse {
    #[serde(default)]
    deposit: HashMap<String, AssetInfoEntry>,
    #[serde(default)]
    withdraw: HashMap<String, AssetInfoEntry>,
}

#[derive(Debug, Deserialize)]
struct AssetInfoEntry {
    #[serde(default)]
    enabled: bool,
    #[serde(default, deserialize_with = "fiet_types::lenient_decimal")]
    min_amount: Decimal,
    #[serde(default, deserialize_with = "fiet_types::lenient_decimal")]
    max_amount: Decimal,
}

impl AssetInfoEntry {
    fn into_descriptor(self) -> AssetDescriptor {
        AssetDescriptor::new(self.enabled, self.min_amount, self.max_amount)
    }
}

fn stage_of(operation: Operation) -> Stage {
    match operation {
        Operation::Deposit => Stage::Deposit,
        Operation::Withdraw => Stage::Withdraw,
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Loaded transfer capabilities, keyed by uppercase asset code
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferRegistry {
    deposit: HashMap<String, AssetDescriptor>,
    withdraw: HashMap<String, AssetDescriptor>,
}

impl TransferRegistry {
    /// Parse an info document
    pub fn from_json(body: &str) -> Result<Self> {
        let info: TransferInfoResponse = serde_json::from_str(body).map_err(|e| {
            fiet_types::FietError::invalid_response(
                Stage::TransferInfo,
                format!("malformed info response: {e}"),
            )
        })?;
        Ok(Self::from_info(info))
    }

    fn from_info(info: TransferInfoResponse) -> Self {
        fn index(entries: HashMap<String, AssetInfoEntry>) -> HashMap<String, AssetDescriptor> {
            entries
                .into_iter()
                .map(|(code, entry)| (normalize_code(&code), entry.into_descriptor()))
                .collect()
        }

        Self {
            deposit: index(info.deposit),
            withdraw: index(info.withdraw),
        }
    }

    pub fn insert(&mut self, operation: Operation, code: &str, descriptor: AssetDescriptor) {
        self.partition_mut(operation)
            .insert(normalize_code(code), descriptor);
    }

    fn partition(&self, operation: Operation) -> &HashMap<String, AssetDescriptor> {
        match operation {
            Operation::Deposit => &self.deposit,
            Operation::Withdraw => &self.withdraw,
        }
    }

    fn partition_mut(&mut self, operation: Operation) -> &mut HashMap<String, AssetDescriptor> {
        match operation {
            Operation::Deposit => &mut self.deposit,
            Operation::Withdraw => &mut self.withdraw,
        }
    }

    pub fn get(&self, code: &str, operation: Operation) -> Option<&AssetDescriptor> {
        self.partition(operation).get(&normalize_code(code))
    }

    pub fn is_supported(&self, code: &str, operation: Operation) -> bool {
        self.get(code, operation).is_some_and(|d| d.enabled)
    }

    pub fn enabled(&self, operation: Operation) -> BTreeMap<String, AssetDescriptor> {
        self.partition(operation)
            .iter()
            .filter(|(_, d)| d.enabled)
            .map(|(code, d)| (code.clone(), d.clone()))
            .collect()
    }

    pub fn limits(&self, code: &str, operation: Operation) -> Option<AmountConstraint> {
        self.get(code, operation)
            .filter(|d| d.enabled)
            .map(AssetDescriptor::limits)
    }

    /// Check that `code` is enabled for `operation` and `amount` is in bounds
    pub fn validate(&self, code: &str, operation: Operation, amount: Decimal) -> Result<()> {
        let stage = stage_of(operation);
        let code = normalize_code(code);

        let limits = self.limits(&code, operation).ok_or_else(|| {
            ErrorKind::AssetUnsupported {
                code: code.clone(),
                operation,
            }
            .at(stage)
        })?;

        if !limits.contains(amount) {
            return Err(ErrorKind::AmountOutOfRange {
                code,
                amount,
                min: limits.min,
                max: limits.max,
            }
            .at(stage));
        }

        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Transfer-capability catalog, one registry per anchor domain
///
/// A domain's registry is loaded once, on [`AssetCatalog::init`] or on the
/// first transfer to that domain, and kept until [`AssetCatalog::reset`].
/// A transfer is only ever validated against its own domain's info.
pub struct AssetCatalog {
    resolver: Arc<ManifestResolver>,
    transport: Arc<dyn HttpTransport>,
    default_domain: String,
    registries: KeyedLoadOnce<TransferRegistry>,
}

impl AssetCatalog {
    pub fn new(
        resolver: Arc<ManifestResolver>,
        transport: Arc<dyn HttpTransport>,
        default_domain: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            transport,
            default_domain: default_domain.into(),
            registries: KeyedLoadOnce::new(),
        }
    }

    fn domain<'a>(&'a self, domain: Option<&'a str>) -> &'a str {
        domain.unwrap_or(&self.default_domain)
    }

    /// Load capability info for `domain` (or the default) unless already loaded
    pub async fn init(&self, domain: Option<&str>) -> Result<()> {
        let domain = self.domain(domain);
        let endpoint = self
            .resolver
            .endpoint(domain, ManifestField::TransferServerSep24)
            .await
            .map_err(|e| e.in_stage(Stage::TransferInfo))?;
        self.ensure_loaded(domain, &endpoint).await.map(|_| ())
    }

    pub fn is_loaded(&self, domain: Option<&str>) -> bool {
        self.registries.is_loaded(&domain_key(self.domain(domain)))
    }

    /// Forget loaded info for every domain; the next transfer reloads it
    pub fn reset(&self) {
        self.registries.clear();
    }

    /// Forget loaded info for one domain
    pub fn reset_domain(&self, domain: &str) {
        self.registries.remove(&domain_key(domain));
    }

    async fn ensure_loaded(&self, domain: &str, endpoint: &str) -> Result<Arc<TransferRegistry>> {
        self.registries
            .get_or_load(&domain_key(domain), || self.load(endpoint))
            .await
            .map_err(|e| e.in_stage(Stage::TransferInfo))
    }

    async fn load(&self, endpoint: &str) -> Result<TransferRegistry> {
        let url = format!("{endpoint}/info");
        let response = self
            .transport
            .send(HttpRequest::get(&url))
            .await
            .map_err(|e| e.at(Stage::TransferInfo))?
            .require_success(Stage::TransferInfo)?;

        let registry = TransferRegistry::from_json(&response.body)?;
        tracing::debug!(
            url = %url,
            deposit = registry.deposit.len(),
            withdraw = registry.withdraw.len(),
            "loaded transfer info"
        );
        Ok(registry)
    }

    /// Start an interactive deposit
    pub async fn perform_deposit(
        &self,
        request: &TransferRequest,
        token: &AuthToken,
    ) -> Result<InteractiveSession> {
        self.perform(Operation::Deposit, request, token).await
    }

    /// Start an interactive withdrawal
    pub async fn perform_withdraw(
        &self,
        request: &TransferRequest,
        token: &AuthToken,
    ) -> Result<InteractiveSession> {
        self.perform(Operation::Withdraw, request, token).await
    }

    async fn perform(
        &self,
        operation: Operation,
        request: &TransferRequest,
        token: &AuthToken,
    ) -> Result<InteractiveSession> {
        let stage = stage_of(operation);
        self.start_session(operation, request, token)
            .await
            .map_err(|e| e.in_stage(stage))
    }

    async fn start_session(
        &self,
        operation: Operation,
        request: &TransferRequest,
        token: &AuthToken,
    ) -> Result<InteractiveSession> {
        let stage = stage_of(operation);
        let domain = self.domain(request.domain.as_deref());
        let endpoint = self
            .resolver
            .endpoint(domain, ManifestField::TransferServerSep24)
            .await?;

        let registry = self.ensure_loaded(domain, &endpoint).await?;
        registry.validate(&request.asset_code, operation, request.amount)?;

        let url = format!("{endpoint}/transactions/{operation}/interactive");
        let body = json!({
            "asset_code": request.asset_code,
            "account": request.account,
            "amount": request.amount.to_string(),
        });
        let response = self
            .transport
            .send(HttpRequest::post(&url, body).bearer(token.bearer()))
            .await
            .map_err(|e| e.at(stage))?
            .require_success(stage)?;

        let session: InteractiveSession = response.json(stage)?;
        tracing::info!(
            operation = %operation,
            domain,
            asset = %request.asset_code,
            id = %session.anchor_id,
            "interactive session started"
        );
        Ok(session)
    }

    /// Loaded registry of `domain` (or the default), if any
    pub fn registry(&self, domain: Option<&str>) -> Option<Arc<TransferRegistry>> {
        self.registries.get(&domain_key(self.domain(domain)))
    }

    fn with_registry<R>(
        &self,
        domain: Option<&str>,
        query: impl FnOnce(&TransferRegistry) -> R,
    ) -> Option<R> {
        self.registry(domain).map(|registry| query(registry.as_ref()))
    }

    pub fn is_asset_supported(&self, code: &str, operation: Operation, domain: Option<&str>) -> bool {
        self.with_registry(domain, |r| r.is_supported(code, operation))
            .unwrap_or(false)
    }

    pub fn get_asset_details(
        &self,
        code: &str,
        operation: Operation,
        domain: Option<&str>,
    ) -> Option<AssetDescriptor> {
        self.with_registry(domain, |r| r.get(code, operation).cloned())
            .flatten()
    }

    /// Enabled assets for `operation`, empty before the domain's first load
    pub fn get_enabled_assets(
        &self,
        operation: Operation,
        domain: Option<&str>,
    ) -> BTreeMap<String, AssetDescriptor> {
        self.with_registry(domain, |r| r.enabled(operation))
            .unwrap_or_default()
    }

    /// Bounds for an enabled asset; `None` if missing or disabled
    pub fn get_asset_limits(
        &self,
        code: &str,
        operation: Operation,
        domain: Option<&str>,
    ) -> Option<AmountConstraint> {
        self.with_registry(domain, |r| r.limits(code, operation))
            .flatten()
    }

    /// Validate against loaded info without any network call
    pub fn validate_amount(
        &self,
        code: &str,
        operation: Operation,
        amount: Decimal,
        domain: Option<&str>,
    ) -> Result<()> {
        match self.registry(domain) {
            Some(registry) => registry.validate(code, operation, amount),
            None => Err(ErrorKind::AssetUnsupported {
                code: normalize_code(code),
                operation,
            }
            .at(stage_of(operation))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTransport, StaticFetcher};
    use crate::transport::Method;
    use fiet_types::AnchorManifest;
    use rust_decimal_macros::dec;

    const DOMAIN: &str = "testanchor.stellar.org";
    const SEP24: &str = "https://testanchor.stellar.org/sep24";
    const INFO: &str = "https://testanchor.stellar.org/sep24/info";
    const DEPOSIT: &str = "https://testanchor.stellar.org/sep24/transactions/deposit/interactive";
    const WITHDRAW: &str = "https://testanchor.stellar.org/sep24/transactions/withdraw/interactive";
    const ACCOUNT: &str = "GA5ZSEJYB37JRC5AVCIA5MOP4RHTM335X2KGX3IHOJAPP5RE34K4KZVN";

    fn info() -> serde_json::Value {
        json!({
            "deposit": {
                "usdc": { "enabled": true, "min_amount": 10, "max_amount": 100 },
                "SRT": { "enabled": false, "min_amount": "1", "max_amount": "5" },
                "ETH": { "enabled": true }
            },
            "withdraw": {
                "USDC": { "enabled": true, "min_amount": "0.5", "max_amount": 50.25 }
            }
        })
    }

    fn catalog(transport: Arc<MockTransport>) -> AssetCatalog {
        let manifest = AnchorManifest::new(DOMAIN)
            .with(ManifestField::TransferServerSep24, format!("{SEP24}/"));
        let fetcher = Arc::new(StaticFetcher::new().with_manifest(manifest));
        AssetCatalog::new(Arc::new(ManifestResolver::new(fetcher)), transport, DOMAIN)
    }

    fn transport() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.on_get(INFO, info());
        transport.on_post(
            DEPOSIT,
            json!({ "type": "interactive_customer_info_needed", "url": "https://anchor/form", "id": "tx-1" }),
        );
        transport.on_post(
            WITHDRAW,
            json!({ "type": "interactive_customer_info_needed", "url": "https://anchor/out", "id": "tx-2" }),
        );
        transport
    }

    fn token() -> AuthToken {
        AuthToken::new("jwt", ACCOUNT)
    }

    #[test]
    fn test_registry_normalizes_codes_and_defaults() {
        let registry = TransferRegistry::from_json(&info().to_string()).unwrap();

        assert!(registry.is_supported("USDC", Operation::Deposit));
        assert!(registry.is_supported(" usdc ", Operation::Deposit));
        assert!(!registry.is_supported("SRT", Operation::Deposit));

        let eth = registry.get("eth", Operation::Deposit).unwrap();
        assert_eq!(eth.min_amount, Decimal::ZERO);
        assert_eq!(eth.max_amount, Decimal::ZERO);

        let limits = registry.limits("USDC", Operation::Withdraw).unwrap();
        assert_eq!(limits.min, dec!(0.5));
        assert_eq!(limits.max, dec!(50.25));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let registry = TransferRegistry::from_json(&info().to_string()).unwrap();

        for amount in [dec!(10), dec!(100), dec!(42.42)] {
            assert!(registry.validate("USDC", Operation::Deposit, amount).is_ok());
        }
        for amount in [dec!(9.99), dec!(100.01)] {
            let err = registry
                .validate("USDC", Operation::Deposit, amount)
                .unwrap_err();
            assert_eq!(err.error_code(), "AMOUNT_OUT_OF_RANGE");
        }
    }

    #[test]
    fn test_disabled_or_missing_asset_is_unsupported() {
        let registry = TransferRegistry::from_json(&info().to_string()).unwrap();

        let err = registry.validate("SRT", Operation::Deposit, dec!(2)).unwrap_err();
        assert_eq!(err.error_code(), "ASSET_UNSUPPORTED");
        let err = registry.validate("ETH", Operation::Withdraw, dec!(2)).unwrap_err();
        assert_eq!(err.stage, Stage::Withdraw);
    }

    #[test]
    fn test_malformed_info() {
        let err = TransferRegistry::from_json(r#"{"deposit": {"USDC": {"min_amount": "ten"}}}"#)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_RESPONSE");
    }

    #[tokio::test]
    async fn test_deposit_loads_validates_and_starts_session() {
        let transport = transport();
        let catalog = catalog(transport.clone());
        assert!(!catalog.is_loaded(None));

        let request = TransferRequest::new(ACCOUNT, "USDC", dec!(25.50));
        let session = catalog.perform_deposit(&request, &token()).await.unwrap();

        assert_eq!(session.anchor_id, "tx-1");
        assert_eq!(session.url, "https://anchor/form");
        assert!(catalog.is_loaded(None));

        let post = transport
            .requests()
            .into_iter()
            .find(|r| r.url == DEPOSIT)
            .unwrap();
        assert_eq!(post.bearer.as_deref(), Some("jwt"));
        let body = post.body.unwrap();
        assert_eq!(body["asset_code"], "USDC");
        assert_eq!(body["account"], ACCOUNT);
        assert_eq!(body["amount"], "25.50");
    }

    #[tokio::test]
    async fn test_withdraw_uses_withdraw_partition() {
        let transport = transport();
        let catalog = catalog(transport.clone());

        let request = TransferRequest::new(ACCOUNT, "usdc", dec!(50.25));
        let session = catalog.perform_withdraw(&request, &token()).await.unwrap();
        assert_eq!(session.anchor_id, "tx-2");

        let err = catalog
            .perform_withdraw(&TransferRequest::new(ACCOUNT, "USDC", dec!(60)), &token())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "AMOUNT_OUT_OF_RANGE");
        assert_eq!(err.stage, Stage::Withdraw);
    }

    #[tokio::test]
    async fn test_rejected_request_issues_no_post() {
        let transport = transport();
        let catalog = catalog(transport.clone());

        let err = catalog
            .perform_deposit(&TransferRequest::new(ACCOUNT, "SRT", dec!(2)), &token())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ASSET_UNSUPPORTED");

        let err = catalog
            .perform_deposit(&TransferRequest::new(ACCOUNT, "USDC", dec!(9.99)), &token())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "AMOUNT_OUT_OF_RANGE");

        assert_eq!(transport.count_method(Method::Post), 0);
        assert_eq!(transport.count(Method::Get, INFO), 1);
    }

    #[tokio::test]
    async fn test_concurrent_transfers_load_info_once() {
        let transport = transport();
        let catalog = Arc::new(catalog(transport.clone()));

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let catalog = catalog.clone();
                tokio::spawn(async move {
                    let request = TransferRequest::new(ACCOUNT, "USDC", dec!(20));
                    catalog.perform_deposit(&request, &token()).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(transport.count(Method::Get, INFO), 1);
        assert_eq!(transport.count(Method::Post, DEPOSIT), 6);
    }

    #[tokio::test]
    async fn test_queries_and_reset() {
        let transport = transport();
        let catalog = catalog(transport.clone());
        assert!(catalog.get_enabled_assets(Operation::Deposit, None).is_empty());
        assert!(catalog.validate_amount("USDC", Operation::Deposit, dec!(20), None).is_err());

        catalog.init(None).await.unwrap();
        catalog.init(Some(DOMAIN)).await.unwrap();
        assert_eq!(transport.count(Method::Get, INFO), 1);

        let enabled = catalog.get_enabled_assets(Operation::Deposit, None);
        assert_eq!(enabled.keys().collect::<Vec<_>>(), vec!["ETH", "USDC"]);
        assert!(catalog.is_asset_supported("usdc", Operation::Deposit, None));
        assert!(catalog.get_asset_details("SRT", Operation::Deposit, None).is_some());
        assert!(catalog.get_asset_limits("SRT", Operation::Deposit, None).is_none());
        assert!(catalog.get_asset_limits("BTC", Operation::Deposit, None).is_none());
        assert!(catalog.validate_amount("USDC", Operation::Deposit, dec!(100), None).is_ok());

        catalog.reset();
        assert!(!catalog.is_loaded(None));
        catalog.init(None).await.unwrap();
        assert_eq!(transport.count(Method::Get, INFO), 2);
    }

    #[tokio::test]
    async fn test_failed_load_is_tagged_and_retried_next_call() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Method::Get, INFO, 503, "maintenance");
        let catalog = catalog(transport.clone());

        let err = catalog.init(None).await.unwrap_err();
        assert_eq!(err.stage, Stage::TransferInfo);
        assert_eq!(err.status(), Some(503));
        assert!(!catalog.is_loaded(None));

        transport.on_get(INFO, info());
        catalog.init(None).await.unwrap();
        assert!(catalog.is_loaded(None));
    }

    #[tokio::test]
    async fn test_missing_transfer_server_issues_no_request() {
        let transport = transport();
        let fetcher = Arc::new(StaticFetcher::new().with_manifest(AnchorManifest::new(DOMAIN)));
        let catalog = AssetCatalog::new(
            Arc::new(ManifestResolver::new(fetcher)),
            transport.clone(),
            DOMAIN,
        );

        let err = catalog
            .perform_deposit(&TransferRequest::new(ACCOUNT, "USDC", dec!(20)), &token())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "MANIFEST_FIELD_MISSING");
        assert_eq!(err.stage, Stage::Deposit);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_each_domain_is_validated_against_its_own_info() {
        let transport = Arc::new(MockTransport::new());
        transport.on_get(
            "https://a.example/sep24/info",
            json!({ "deposit": { "USDC": { "enabled": true, "min_amount": 1, "max_amount": 1000 } } }),
        );
        transport.on_get(
            "https://b.example/sep24/info",
            json!({ "deposit": { "USDC": { "enabled": true, "min_amount": 1, "max_amount": 5 } } }),
        );
        transport.on_post(
            "https://b.example/sep24/transactions/deposit/interactive",
            json!({ "type": "interactive_customer_info_needed", "url": "https://b.example/form", "id": "b-1" }),
        );
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_manifest(
                    AnchorManifest::new("a.example")
                        .with(ManifestField::TransferServerSep24, "https://a.example/sep24"),
                )
                .with_manifest(
                    AnchorManifest::new("b.example")
                        .with(ManifestField::TransferServerSep24, "https://b.example/sep24"),
                ),
        );
        let catalog = AssetCatalog::new(
            Arc::new(ManifestResolver::new(fetcher)),
            transport.clone(),
            "a.example",
        );

        catalog.init(None).await.unwrap();
        assert!(catalog.is_loaded(Some("a.example")));
        assert!(!catalog.is_loaded(Some("b.example")));

        let request = TransferRequest::new(ACCOUNT, "USDC", dec!(500)).with_domain("b.example");
        let err = catalog.perform_deposit(&request, &token()).await.unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::AmountOutOfRange {
                code: "USDC".to_string(),
                amount: dec!(500),
                min: dec!(1),
                max: dec!(5),
            }
        );
        assert_eq!(transport.count(Method::Get, "https://b.example/sep24/info"), 1);
        assert_eq!(transport.count_method(Method::Post), 0);

        let request = TransferRequest::new(ACCOUNT, "USDC", dec!(5)).with_domain("B.Example");
        let session = catalog.perform_deposit(&request, &token()).await.unwrap();
        assert_eq!(session.anchor_id, "b-1");
        assert_eq!(transport.count(Method::Get, "https://b.example/sep24/info"), 1);

        assert_eq!(
            catalog.get_asset_limits("USDC", Operation::Deposit, None).map(|l| l.max),
            Some(dec!(1000))
        );
        catalog.reset_domain("b.example");
        assert!(catalog.is_loaded(None));
        assert!(!catalog.is_loaded(Some("b.example")));
    }
}
