//! Indicative price quote types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request for an indicative price between two asset codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Code of the asset to sell (e.g. `USD`)
    pub sell_code: String,
    /// Code of the asset to buy (e.g. `USDC`)
    pub buy_code: String,
    pub sell_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl QuoteRequest {
    pub fn new(sell_code: impl Into<String>, buy_code: impl Into<String>, sell_amount: Decimal) -> Self {
        Self {
            sell_code: sell_code.into(),
            buy_code: buy_code.into(),
            sell_amount,
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Price and fee fields exactly as the anchor returned them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub price: String,
    pub sell_amount: String,
    pub buy_amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<QuoteFee>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteFee {
    pub total: String,
    /// Fully-qualified identifier of the fee asset
    pub asset: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FeeDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDetail {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_result_parses_fee_breakdown() {
        let json = r#"{
            "price": "1.00",
            "sell_amount": "102.00",
            "buy_amount": "100.00",
            "fee": {
                "total": "2.00",
                "asset": "iso4217:USD",
                "details": [{ "name": "Service fee", "amount": "2.00" }]
            }
        }"#;
        let quote: QuoteResult = serde_json::from_str(json).unwrap();
        let fee = quote.fee.unwrap();
        assert_eq!(quote.price, "1.00");
        assert_eq!(fee.details.len(), 1);
        assert_eq!(fee.details[0].description, None);
    }
}
