//! Asset types: transfer capabilities and fully-qualified identifiers

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of an interactive transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Deposit,
    Withdraw,
}

impl Operation {
    /// Path segment used by the interactive endpoints
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability of one asset for one operation, as published by the anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub enabled: bool,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
}

impl AssetDescriptor {
    pub fn new(enabled: bool, min_amount: Decimal, max_amount: Decimal) -> Self {
        Self {
            enabled,
            min_amount,
            max_amount,
        }
    }

    /// Amount bounds of this descriptor
    pub fn limits(&self) -> AmountConstraint {
        AmountConstraint {
            min: self.min_amount,
            max: self.max_amount,
        }
    }
}

/// Inclusive amount bounds for an asset/operation pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountConstraint {
    pub min: Decimal,
    pub max: Decimal,
}

impl AmountConstraint {
    /// Both bounds are inclusive
    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min && amount <= self.max
    }
}

/// Normalize a transfer asset code for registry lookups
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Fully-qualified asset identifier: `scheme:code[:issuer]`
///
/// Examples: `iso4217:USD`, `stellar:USDC:GA5Z...KZVN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId {
    raw: String,
    code_start: usize,
    code_end: usize,
}

impl AssetId {
    /// Parse an identifier; requires at least a scheme and a non-empty code
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let mut parts = raw.splitn(3, ':');
        let scheme = parts.next()?;
        let code = parts.next()?;
        if scheme.is_empty() || code.is_empty() {
            return None;
        }
        let code_start = scheme.len() + 1;
        let code_end = code_start + code.len();
        Some(Self {
            raw,
            code_start,
            code_end,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.raw[..self.code_start - 1]
    }

    /// Second colon-delimited segment
    pub fn code(&self) -> &str {
        &self.raw[self.code_start..self.code_end]
    }

    pub fn issuer(&self) -> Option<&str> {
        self.raw.get(self.code_end + 1..).filter(|s| !s.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for AssetId {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(value.clone()).ok_or_else(|| format!("invalid asset identifier: {value}"))
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.raw
    }
}

/// Deserialize a decimal from a JSON number or string; `null` becomes zero
pub fn lenient_decimal<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(Decimal::ZERO),
        Some(serde_json::Value::Number(n)) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(serde::de::Error::custom)
        }
        Some(serde_json::Value::String(s)) => {
            Decimal::from_str(s.trim()).map_err(serde::de::Error::custom)
        }
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a decimal amount, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_constraint_is_inclusive() {
        let limits = AmountConstraint {
            min: dec!(10),
            max: dec!(100),
        };
        assert!(limits.contains(dec!(10)));
        assert!(limits.contains(dec!(100)));
        assert!(limits.contains(dec!(55.5)));
        assert!(!limits.contains(dec!(9.99)));
        assert!(!limits.contains(dec!(100.01)));
    }

    #[test]
    fn test_asset_id_segments() {
        let fiat = AssetId::parse("iso4217:USD").unwrap();
        assert_eq!(fiat.scheme(), "iso4217");
        assert_eq!(fiat.code(), "USD");
        assert_eq!(fiat.issuer(), None);

        let usdc = AssetId::parse("stellar:USDC:GA5ZSEJYB37JRC5AVCIA5MOP4RHTM335X2KGX3IHOJAPP5RE34K4KZVN")
            .unwrap();
        assert_eq!(usdc.scheme(), "stellar");
        assert_eq!(usdc.code(), "USDC");
        assert_eq!(
            usdc.issuer(),
            Some("GA5ZSEJYB37JRC5AVCIA5MOP4RHTM335X2KGX3IHOJAPP5RE34K4KZVN")
        );
        assert_eq!(
            usdc.to_string(),
            "stellar:USDC:GA5ZSEJYB37JRC5AVCIA5MOP4RHTM335X2KGX3IHOJAPP5RE34K4KZVN"
        );
    }

    #[test]
    fn test_asset_id_rejects_bare_code() {
        assert!(AssetId::parse("USD").is_none());
        assert!(AssetId::parse("iso4217:").is_none());
        assert!(AssetId::parse(":USD").is_none());
    }

    #[test]
    fn test_lenient_decimal() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default, deserialize_with = "lenient_decimal")]
            amount: Decimal,
        }

        let parse = |json: &str| serde_json::from_str::<Probe>(json).unwrap().amount;
        assert_eq!(parse(r#"{"amount": 10}"#), dec!(10));
        assert_eq!(parse(r#"{"amount": 0.1}"#), dec!(0.1));
        assert_eq!(parse(r#"{"amount": "250.75"}"#), dec!(250.75));
        assert_eq!(parse(r#"{"amount": null}"#), Decimal::ZERO);
        assert_eq!(parse(r#"{}"#), Decimal::ZERO);
        assert!(serde_json::from_str::<Probe>(r#"{"amount": true}"#).is_err());
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("usdc"), "USDC");
        assert_eq!(normalize_code(" srt "), "SRT");
    }
}
