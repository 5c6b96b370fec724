//! The challenge-signing seam
//!
//! The authentication handshake never touches key material directly; it
//! asks a [`ChallengeSigner`] for the public address and a signed envelope.

use fiet_types::{ChallengeTransaction, Result};

use crate::{Keypair, TransactionEnvelope};

/// Identity able to prove control of a ledger address
pub trait ChallengeSigner: Send + Sync {
    /// Address the challenge is requested for
    fn public_address(&self) -> String;

    /// Sign the challenge for the given network, returning the base64 envelope
    fn sign_challenge(
        &self,
        challenge: &ChallengeTransaction,
        network_passphrase: &str,
    ) -> Result<String>;
}

impl ChallengeSigner for Keypair {
    fn public_address(&self) -> String {
        Keypair::public_address(self)
    }

    fn sign_challenge(
        &self,
        challenge: &ChallengeTransaction,
        network_passphrase: &str,
    ) -> Result<String> {
        let mut envelope = TransactionEnvelope::from_base64(challenge.as_str())?;
        envelope.sign(self, network_passphrase)?;
        Ok(envelope.to_base64())
    }
}
