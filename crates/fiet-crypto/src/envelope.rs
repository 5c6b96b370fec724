//! Transaction envelope signing
//!
//! Only the trailing signature block of an envelope is decoded; the
//! transaction body stays opaque bytes. That is enough to compute the
//! signature payload and append a signature.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use fiet_types::Result;
use sha2::{Digest, Sha256};

use crate::{keys::verify_with_key, signing_error, Keypair};

/// XDR discriminant of a v1 transaction envelope
pub const ENVELOPE_TYPE_TX: u32 = 2;

/// Maximum signatures an envelope may carry
pub const MAX_SIGNATURES: usize = 20;

const ED25519_SIGNATURE_LEN: usize = 64;
const DECORATED_SIGNATURE_LEN: usize = 4 + 4 + ED25519_SIGNATURE_LEN;

/// Network id: sha256 of the network passphrase
pub fn network_id(passphrase: &str) -> [u8; 32] {
    Sha256::digest(passphrase.as_bytes()).into()
}

/// Signature plus the hint identifying the signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedSignature {
    pub hint: [u8; 4],
    pub signature: [u8; 64],
}

/// A v1 transaction envelope split into body and signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    transaction: Vec<u8>,
    signatures: Vec<DecoratedSignature>,
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl TransactionEnvelope {
    pub fn new(transaction: Vec<u8>) -> Self {
        Self {
            transaction,
            signatures: Vec::new(),
        }
    }

    /// Decode a base64 envelope
    pub fn from_base64(envelope: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(envelope.trim())
            .map_err(|e| signing_error(format!("challenge is not base64: {e}")))?;
        Self::from_xdr(&bytes)
    }

    /// Decode an envelope from XDR bytes
    ///
    /// The body is not decoded, so the signature block is located from the
    /// end. Candidate counts are tried from [`MAX_SIGNATURES`] down to zero
    /// and the largest one whose count word and every length word line up
    /// is taken. A body whose trailing bytes happen to form such a block
    /// would be misread; for real envelopes that needs several exact 32-bit
    /// matches at once.
    pub fn from_xdr(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(signing_error("challenge envelope is truncated"));
        }
        let envelope_type = read_u32(bytes, 0);
        if envelope_type != ENVELOPE_TYPE_TX {
            return Err(signing_error(format!(
                "unsupported envelope type {envelope_type}"
            )));
        }

        for count in (0..=MAX_SIGNATURES).rev() {
            let tail = 4 + count * DECORATED_SIGNATURE_LEN;
            if bytes.len() < 4 + tail {
                continue;
            }
            let start = bytes.len() - tail;
            if read_u32(bytes, start) as usize != count {
                continue;
            }

            let mut signatures = Vec::with_capacity(count);
            let well_formed = (0..count).all(|i| {
                let at = start + 4 + i * DECORATED_SIGNATURE_LEN;
                if read_u32(bytes, at + 4) as usize != ED25519_SIGNATURE_LEN {
                    return false;
                }
                let mut hint = [0u8; 4];
                hint.copy_from_slice(&bytes[at..at + 4]);
                let mut signature = [0u8; 64];
                signature.copy_from_slice(&bytes[at + 8..at + DECORATED_SIGNATURE_LEN]);
                signatures.push(DecoratedSignature { hint, signature });
                true
            });

            if well_formed {
                return Ok(Self {
                    transaction: bytes[4..start].to_vec(),
                    signatures,
                });
            }
        }

        Err(signing_error("challenge envelope has no readable signature block"))
    }

    pub fn transaction(&self) -> &[u8] {
        &self.transaction
    }

    pub fn signatures(&self) -> &[DecoratedSignature] {
        &self.signatures
    }

    /// Hash that signers sign: sha256(network id || ENVELOPE_TYPE_TX || tx)
    pub fn signature_payload(&self, network_passphrase: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(network_id(network_passphrase));
        hasher.update(ENVELOPE_TYPE_TX.to_be_bytes());
        hasher.update(&self.transaction);
        hasher.finalize().into()
    }

    /// Sign with `keypair` and append the decorated signature
    pub fn sign(&mut self, keypair: &Keypair, network_passphrase: &str) -> Result<()> {
        if self.signatures.len() >= MAX_SIGNATURES {
            return Err(signing_error("envelope already carries the maximum signatures"));
        }
        let payload = self.signature_payload(network_passphrase);
        self.signatures.push(DecoratedSignature {
            hint: keypair.signature_hint(),
            signature: keypair.sign(&payload),
        });
        Ok(())
    }

    /// Whether any signature verifies for `public_key` on this network
    pub fn is_signed_by(&self, public_key: &[u8; 32], network_passphrase: &str) -> bool {
        let payload = self.signature_payload(network_passphrase);
        self.signatures
            .iter()
            .filter(|s| s.hint[..] == public_key[28..32])
            .any(|s| verify_with_key(public_key, &payload, &s.signature))
    }

    pub fn to_xdr(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            8 + self.transaction.len() + self.signatures.len() * DECORATED_SIGNATURE_LEN,
        );
        out.extend_from_slice(&ENVELOPE_TYPE_TX.to_be_bytes());
        out.extend_from_slice(&self.transaction);
        out.extend_from_slice(&(self.signatures.len() as u32).to_be_bytes());
        for s in &self.signatures {
            out.extend_from_slice(&s.hint);
            out.extend_from_slice(&(ED25519_SIGNATURE_LEN as u32).to_be_bytes());
            out.extend_from_slice(&s.signature);
        }
        out
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_xdr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiet_types::TESTNET_PASSPHRASE;

    /// Envelope as an anchor would issue it: opaque body, server-signed
    fn server_signed_challenge(server: &Keypair) -> String {
        let mut envelope = TransactionEnvelope::new(vec![0xAB; 156]);
        envelope.sign(server, TESTNET_PASSPHRASE).unwrap();
        envelope.to_base64()
    }

    #[test]
    fn test_parse_preserves_body_and_signatures() {
        let server = Keypair::random();
        let challenge = server_signed_challenge(&server);

        let envelope = TransactionEnvelope::from_base64(&challenge).unwrap();
        assert_eq!(envelope.transaction(), &[0xAB; 156][..]);
        assert_eq!(envelope.signatures().len(), 1);
        assert!(envelope.is_signed_by(&server.public_key_bytes(), TESTNET_PASSPHRASE));
        assert_eq!(envelope.to_base64(), challenge);
    }

    #[test]
    fn test_client_signature_is_appended() {
        let server = Keypair::random();
        let client = Keypair::random();
        let mut envelope =
            TransactionEnvelope::from_base64(&server_signed_challenge(&server)).unwrap();

        envelope.sign(&client, TESTNET_PASSPHRASE).unwrap();
        let reparsed = TransactionEnvelope::from_base64(&envelope.to_base64()).unwrap();

        assert_eq!(reparsed.signatures().len(), 2);
        assert!(reparsed.is_signed_by(&server.public_key_bytes(), TESTNET_PASSPHRASE));
        assert!(reparsed.is_signed_by(&client.public_key_bytes(), TESTNET_PASSPHRASE));
    }

    #[test]
    fn test_signature_ending_in_zero_bytes_is_kept() {
        let mut signature = [0x5Au8; 64];
        signature[60..].copy_from_slice(&[0, 0, 0, 0]);
        let envelope = TransactionEnvelope {
            transaction: vec![0xAB; 40],
            signatures: vec![DecoratedSignature {
                hint: [1, 2, 3, 4],
                signature,
            }],
        };

        let reparsed = TransactionEnvelope::from_xdr(&envelope.to_xdr()).unwrap();
        assert_eq!(reparsed, envelope);
    }

    #[test]
    fn test_signature_is_bound_to_network() {
        let client = Keypair::random();
        let mut envelope = TransactionEnvelope::new(vec![1, 2, 3, 4]);
        envelope.sign(&client, TESTNET_PASSPHRASE).unwrap();

        assert!(!envelope.is_signed_by(
            &client.public_key_bytes(),
            fiet_types::PUBLIC_PASSPHRASE
        ));
    }

    #[test]
    fn test_rejects_other_envelope_types() {
        let mut bytes = vec![0, 0, 0, 0];
        bytes.extend_from_slice(&[0u8; 32]);
        assert!(TransactionEnvelope::from_xdr(&bytes).is_err());
        assert!(TransactionEnvelope::from_base64("!!not base64!!").is_err());
        assert!(TransactionEnvelope::from_xdr(&[0, 0, 0, 2]).is_err());
    }
}
