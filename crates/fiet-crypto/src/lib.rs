//! Fiet Crypto - Keys and challenge signing
//!
//! This crate provides:
//! - Ed25519 keypairs addressed by ledger account (`G...`) and seed (`S...`)
//! - Transaction envelope signing for challenge/response authentication
//! - The [`ChallengeSigner`] seam the authentication handshake signs through
//!
//! # Security Invariant
//!
//! **Secret seeds never appear in logs or `Debug` output.**

pub mod envelope;
pub mod keys;
pub mod signer;

pub use envelope::*;
pub use keys::*;
pub use signer::*;

use fiet_types::{ErrorKind, FietError, Stage};

pub(crate) fn signing_error(message: impl Into<String>) -> FietError {
    ErrorKind::Signing {
        message: message.into(),
    }
    .at(Stage::Authentication)
}
