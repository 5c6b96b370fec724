//! Interactive transfer (deposit/withdraw) types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request for an interactive deposit or withdraw session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Ledger account (G... or M...) funds move to or from
    pub account: String,
    pub asset_code: String,
    pub amount: Decimal,
    /// Anchor domain; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl TransferRequest {
    pub fn new(account: impl Into<String>, asset_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account: account.into(),
            asset_code: asset_code.into(),
            amount,
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Interactive session started by the anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveSession {
    /// Usually `interactive_customer_info_needed`
    #[serde(rename = "type")]
    pub kind: String,
    /// Page the user must visit to complete the transfer
    pub url: String,
    /// Anchor's transaction id
    #[serde(rename = "id")]
    pub anchor_id: String,
}
