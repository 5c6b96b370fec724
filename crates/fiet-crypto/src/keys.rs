//! Key management

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use fiet_types::address::{self, KeyKind};
use fiet_types::Result;
use rand::rngs::OsRng;
use std::fmt;

/// An ed25519 keypair identified by its ledger account address
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Keypair {
    /// Generate a new random keypair
    pub fn random() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Create from raw secret key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    /// Create from an `S...` secret seed
    pub fn from_secret(seed: &str) -> Result<Self> {
        let bytes = address::decode(KeyKind::Seed, seed.trim())?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(Self::from_bytes(&key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// `G...` account address
    pub fn public_address(&self) -> String {
        address::encode_account(self.verifying_key.as_bytes())
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// `S...` secret seed (for secure storage only!)
    pub fn secret_seed(&self) -> String {
        address::encode(KeyKind::Seed, &self.signing_key.to_bytes())
    }

    /// Last four bytes of the public key, used to tag signatures
    pub fn signature_hint(&self) -> [u8; 4] {
        let key = self.verifying_key.as_bytes();
        [key[28], key[29], key[30], key[31]]
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        verify_with_key(&self.public_key_bytes(), message, signature)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.public_address())
            .finish_non_exhaustive()
    }
}

/// Verify an ed25519 signature against raw public key bytes
pub fn verify_with_key(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(signature)).is_ok()
}
