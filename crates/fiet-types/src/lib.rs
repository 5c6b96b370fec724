//! Fiet Types - Canonical domain types for anchor interoperability
//!
//! This crate contains the foundational types shared by every Fiet crate,
//! with zero dependencies on other fiet crates:
//!
//! - Anchor manifests and their well-known endpoint fields
//! - Transfer capabilities, amount bounds and asset identifiers
//! - Authentication, interactive transfer and quote results
//! - Ledger address encoding (accounts, muxed accounts, seeds)
//! - The error taxonomy every operation reports through
//!
//! # Invariants
//!
//! 1. Amounts are exact decimals, never floating point
//! 2. Transfer asset codes are stored uppercase
//! 3. Every failure names the protocol stage it happened in

pub mod address;
pub mod asset;
pub mod auth;
pub mod error;
pub mod manifest;
pub mod network;
pub mod quote;
pub mod transfer;

pub use address::{
    base_account, create_muxed_account, decode_muxed_account, is_muxed_account,
    is_valid_account, KeyKind, MuxedAccount,
};
pub use asset::*;
pub use auth::*;
pub use error::*;
pub use manifest::*;
pub use network::*;
pub use quote::*;
pub use transfer::*;

pub use rust_decimal::Decimal;
