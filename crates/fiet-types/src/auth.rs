//! Authentication types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Challenge transaction issued by an anchor, base64 envelope
///
/// Created per authentication attempt and consumed once.
#[derive(Clone, PartialEq, Eq)]
pub struct ChallengeTransaction(pub String);

impl ChallengeTransaction {
    pub fn new(envelope: impl Into<String>) -> Self {
        Self(envelope.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChallengeTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChallengeTransaction({} bytes)", self.0.len())
    }
}

/// Bearer credential returned by a successful handshake
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
    /// Public address the token was issued for
    pub account: String,
}

impl AuthToken {
    pub fn new(token: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            account: account.into(),
        }
    }

    pub fn bearer(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"<redacted>")
            .field("account", &self.account)
            .finish()
    }
}
