//! Error types for Fiet
//!
//! Every failure surfaces as one [`FietError`]: the protocol [`Stage`] of the
//! operation that failed plus the classifiable [`ErrorKind`] of the cause.
//! Nothing is retried or swallowed locally.

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use crate::Operation;

/// Result type for Fiet operations
pub type Result<T> = std::result::Result<T, FietError>;

/// Protocol stage an error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Resolving the anchor manifest
    Manifest,
    /// SEP-10 challenge/response handshake
    Authentication,
    /// Loading SEP-24 capability info
    TransferInfo,
    /// SEP-24 interactive deposit
    Deposit,
    /// SEP-24 interactive withdraw
    Withdraw,
    /// Loading SEP-38 asset info
    QuoteInfo,
    /// SEP-38 indicative price
    Quote,
    /// Address and key handling outside any network round-trip
    Local,
}

impl Stage {
    /// Protocol tag for the stage, as anchors document it
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::Manifest => "SEP-1",
            Self::Authentication => "SEP-10",
            Self::TransferInfo | Self::Deposit | Self::Withdraw => "SEP-24",
            Self::QuoteInfo | Self::Quote => "SEP-38",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest => write!(f, "manifest"),
            Self::Authentication => write!(f, "authentication"),
            Self::TransferInfo => write!(f, "transfer info"),
            Self::Deposit => write!(f, "deposit"),
            Self::Withdraw => write!(f, "withdraw"),
            Self::QuoteInfo => write!(f, "quote info"),
            Self::Quote => write!(f, "quote"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Classifiable cause of a failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // ========================================================================
    // Transport Errors
    // ========================================================================

    /// Transport failure or unexpected HTTP status
    #[error("Network error{}: {message}", fmt_status(.status))]
    Network { status: Option<u16>, message: String },

    /// Anchor returned a body we could not interpret
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    // ========================================================================
    // Manifest Errors
    // ========================================================================

    /// The manifest document could not be fetched or parsed
    #[error("Manifest unavailable for {domain}: {message}")]
    ManifestUnavailable { domain: String, message: String },

    /// A required endpoint is absent from the manifest
    #[error("Manifest for {domain} has no {field}")]
    ManifestFieldMissing { domain: String, field: &'static str },

    // ========================================================================
    // Authentication Errors
    // ========================================================================

    /// The anchor refused to issue a challenge
    #[error("Challenge rejected (HTTP {status}): {message}")]
    ChallengeRejected { status: u16, message: String },

    /// The anchor rejected the signed challenge or returned no token
    #[error("Authentication failed: {message}")]
    AuthenticationFailure { status: Option<u16>, message: String },

    /// The signing collaborator could not sign the challenge
    #[error("Signing failed: {message}")]
    Signing { message: String },

    // ========================================================================
    // Asset Errors
    // ========================================================================

    /// Asset absent or disabled for the requested operation
    #[error("Asset {code} not supported for {operation}")]
    AssetUnsupported { code: String, operation: Operation },

    /// Asset code not present in the quote registry
    #[error("Unknown asset: {code}")]
    AssetUnknown { code: String },

    /// Amount outside the asset's inclusive bounds
    #[error("Amount {amount} for {code} outside [{min}, {max}]")]
    AmountOutOfRange {
        code: String,
        amount: Decimal,
        min: Decimal,
        max: Decimal,
    },

    // ========================================================================
    // Local Errors
    // ========================================================================

    /// Malformed account, muxed account or seed
    #[error("Invalid address: {message}")]
    InvalidAddress { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl ErrorKind {
    /// Attribute this cause to a protocol stage
    pub fn at(self, stage: Stage) -> FietError {
        FietError { stage, kind: self }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network { .. } => "NETWORK_ERROR",
            Self::InvalidResponse { .. } => "INVALID_RESPONSE",
            Self::ManifestUnavailable { .. } => "MANIFEST_UNAVAILABLE",
            Self::ManifestFieldMissing { .. } => "MANIFEST_FIELD_MISSING",
            Self::ChallengeRejected { .. } => "CHALLENGE_REJECTED",
            Self::AuthenticationFailure { .. } => "AUTHENTICATION_FAILURE",
            Self::Signing { .. } => "SIGNING_FAILED",
            Self::AssetUnsupported { .. } => "ASSET_UNSUPPORTED",
            Self::AssetUnknown { .. } => "ASSET_UNKNOWN",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::InvalidAddress { .. } => "INVALID_ADDRESS",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }

    /// HTTP status carried by the cause, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } | Self::AuthenticationFailure { status, .. } => *status,
            Self::ChallengeRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A failed operation: where it failed and why
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}: {kind}", .stage.protocol_label())]
pub struct FietError {
    pub stage: Stage,
    #[source]
    pub kind: ErrorKind,
}

impl Stage {
    fn protocol_label(&self) -> String {
        format!("{} {}", self.protocol(), self)
    }
}

impl FietError {
    pub fn new(stage: Stage, kind: ErrorKind) -> Self {
        Self { stage, kind }
    }

    /// Re-tag with the stage of the enclosing operation
    pub fn in_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn error_code(&self) -> &'static str {
        self.kind.error_code()
    }

    pub fn status(&self) -> Option<u16> {
        self.kind.status()
    }

    /// Shorthand for a network error at a stage
    pub fn network(stage: Stage, status: Option<u16>, message: impl Into<String>) -> Self {
        ErrorKind::Network {
            status,
            message: message.into(),
        }
        .at(stage)
    }

    /// Shorthand for an invalid-response error at a stage
    pub fn invalid_response(stage: Stage, message: impl Into<String>) -> Self {
        ErrorKind::InvalidResponse {
            message: message.into(),
        }
        .at(stage)
    }

    /// Shorthand for an invalid-address error
    pub fn invalid_address(message: impl Into<String>) -> Self {
        ErrorKind::InvalidAddress {
            message: message.into(),
        }
        .at(Stage::Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_display_carries_protocol_and_stage() {
        let err = ErrorKind::AssetUnsupported {
            code: "USDC".to_string(),
            operation: Operation::Deposit,
        }
        .at(Stage::Deposit);

        assert_eq!(
            err.to_string(),
            "SEP-24 deposit: Asset USDC not supported for deposit"
        );
    }

    #[test]
    fn test_network_status_is_exposed() {
        let err = FietError::network(Stage::Quote, Some(503), "service unavailable");
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.error_code(), "NETWORK_ERROR");
        assert!(err.to_string().contains("HTTP 503"));

        let err = FietError::network(Stage::Quote, None, "connection refused");
        assert_eq!(err.status(), None);
        assert!(!err.to_string().contains("HTTP"));
    }

    #[test]
    fn test_in_stage_keeps_kind() {
        let err = ErrorKind::ManifestFieldMissing {
            domain: "anchor.example".to_string(),
            field: "ANCHOR_QUOTE_SERVER",
        }
        .at(Stage::Manifest)
        .in_stage(Stage::Quote);

        assert_eq!(err.stage, Stage::Quote);
        assert_eq!(err.error_code(), "MANIFEST_FIELD_MISSING");
    }

    #[test]
    fn test_amount_out_of_range_message() {
        let err = ErrorKind::AmountOutOfRange {
            code: "USDC".to_string(),
            amount: dec!(100.01),
            min: dec!(10),
            max: dec!(100),
        };
        assert_eq!(err.to_string(), "Amount 100.01 for USDC outside [10, 100]");
    }
}
