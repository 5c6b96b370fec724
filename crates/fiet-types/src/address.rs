//! Ledger address encoding (StrKey)
//!
//! Accounts (`G...`), muxed accounts (`M...`) and secret seeds (`S...`) are
//! base32 strings of `version byte || payload || crc16-xmodem (LE)`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FietError, Result};

const ALPHABET: base32::Alphabet = base32::Alphabet::RFC4648 { padding: false };

/// Kind of StrKey, determines the version byte and payload length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Account,
    Seed,
    MuxedAccount,
}

impl KeyKind {
    fn version_byte(&self) -> u8 {
        match self {
            Self::Account => 6 << 3,
            Self::Seed => 18 << 3,
            Self::MuxedAccount => 12 << 3,
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            Self::Account | Self::Seed => 32,
            Self::MuxedAccount => 40,
        }
    }
}

fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Encode a payload as a StrKey of the given kind
pub fn encode(kind: KeyKind, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 3);
    data.push(kind.version_byte());
    data.extend_from_slice(payload);
    let checksum = crc16_xmodem(&data);
    data.extend_from_slice(&checksum.to_le_bytes());
    base32::encode(ALPHABET, &data)
}

/// Decode a StrKey, checking version byte, length and checksum
pub fn decode(kind: KeyKind, strkey: &str) -> Result<Vec<u8>> {
    let data = base32::decode(ALPHABET, strkey)
        .ok_or_else(|| FietError::invalid_address(format!("{strkey} is not base32")))?;

    if data.len() != kind.payload_len() + 3 {
        return Err(FietError::invalid_address(format!(
            "{strkey} has the wrong length for {kind:?}"
        )));
    }
    if data[0] != kind.version_byte() {
        return Err(FietError::invalid_address(format!(
            "{strkey} is not a {kind:?} key"
        )));
    }

    let (body, checksum) = data.split_at(data.len() - 2);
    let expected = crc16_xmodem(body).to_le_bytes();
    if checksum != expected {
        return Err(FietError::invalid_address(format!(
            "{strkey} has an invalid checksum"
        )));
    }

    // Reject non-canonical spellings (lowercase, trailing bits)
    if encode(kind, &body[1..]) != strkey {
        return Err(FietError::invalid_address(format!(
            "{strkey} is not canonically encoded"
        )));
    }

    Ok(body[1..].to_vec())
}

pub fn encode_account(public_key: &[u8; 32]) -> String {
    encode(KeyKind::Account, public_key)
}

pub fn decode_account(address: &str) -> Result<[u8; 32]> {
    let bytes = decode(KeyKind::Account, address)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

pub fn is_valid_account(address: &str) -> bool {
    decode(KeyKind::Account, address).is_ok()
}

pub fn is_muxed_account(address: &str) -> bool {
    decode(KeyKind::MuxedAccount, address).is_ok()
}

/// A base account plus a 64-bit sub-account id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MuxedAccount {
    pub base: String,
    pub id: u64,
}

impl MuxedAccount {
    pub fn new(base: impl Into<String>, id: u64) -> Result<Self> {
        let base = base.into();
        if !is_valid_account(&base) {
            return Err(FietError::invalid_address(format!(
                "invalid base account {base}"
            )));
        }
        Ok(Self { base, id })
    }

    /// `M...` address of this muxed account
    pub fn address(&self) -> Result<String> {
        let key = decode_account(&self.base)?;
        let mut payload = Vec::with_capacity(40);
        payload.extend_from_slice(&key);
        payload.extend_from_slice(&self.id.to_be_bytes());
        Ok(encode(KeyKind::MuxedAccount, &payload))
    }

    pub fn parse(muxed_address: &str) -> Result<Self> {
        let payload = decode(KeyKind::MuxedAccount, muxed_address).map_err(|_| {
            FietError::invalid_address("Invalid address. Muxed account starts with 'M'")
        })?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&payload[..32]);
        let mut id = [0u8; 8];
        id.copy_from_slice(&payload[32..]);
        Ok(Self {
            base: encode_account(&key),
            id: u64::from_be_bytes(id),
        })
    }
}

impl fmt::Display for MuxedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.base, self.id)
    }
}

/// Muxed address for `base` and `id`
pub fn create_muxed_account(base: &str, id: u64) -> Result<String> {
    MuxedAccount::new(base, id)?.address()
}

/// Base `G...` account of a muxed address
pub fn base_account(muxed_address: &str) -> Result<String> {
    MuxedAccount::parse(muxed_address).map(|m| m.base)
}

pub fn decode_muxed_account(muxed_address: &str) -> Result<MuxedAccount> {
    MuxedAccount::parse(muxed_address)
}
