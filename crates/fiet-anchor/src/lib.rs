//! Fiet Anchor - client-side orchestration of anchor protocols
//!
//! Talks to an anchor in four steps:
//!
//! - **Manifest**: resolve the domain's `stellar.toml` (cached for an hour)
//! - **Authentication**: sign a challenge transaction and obtain a bearer token
//! - **Transfers**: load capability info, validate amounts, start an
//!   interactive deposit or withdrawal
//! - **Quotes**: map asset codes to identifiers and fetch indicative prices
//!
//! ```ignore
//! let client = AnchorClient::from_env()?;
//! let keypair = Keypair::from_secret(&seed)?;
//! let request = TransferRequest::new(keypair.public_address(), "USDC", dec!(25));
//! let session = client.deposit(&keypair, &request).await?;
//! println!("continue at {}", session.url);
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod manifest;
pub mod once;
pub mod quote;
pub mod transfer;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use auth::*;
pub use client::*;
pub use config::*;
pub use manifest::*;
pub use once::*;
pub use quote::*;
pub use transfer::*;
pub use transport::*;

pub use fiet_crypto;
pub use fiet_types;
