//! Key types.
//!
//! The read-only view backends give of their keys, the identity a provider
//! resolves to, and the parameters it asks a backend to generate with.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Passphrase;
use crate::core::constants;
use crate::core::types::{Fingerprint, Uid};

/// A key as listed by a keyring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub fingerprint: Fingerprint,
    pub uids: Vec<Uid>,
}

impl KeyInfo {
    pub fn new(fingerprint: impl Into<Fingerprint>, uids: Vec<Uid>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            uids,
        }
    }

    /// Whether any uid's first whitespace-delimited token equals `name`,
    /// ignoring case.
    pub fn matches(&self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        self.uids.iter().any(|uid| {
            uid.split_whitespace()
                .next()
                .is_some_and(|token| token.to_lowercase() == wanted)
        })
    }
}

/// The name a provider was asked for and the keypair it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIdentity {
    pub name: String,
    pub fingerprint: Fingerprint,
}

/// Asymmetric key algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Rsa,
    X25519,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::X25519 => "x25519",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities a generated key is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage {
    pub encrypt: bool,
    pub sign: bool,
    pub certify: bool,
    pub authenticate: bool,
}

impl KeyUsage {
    /// Encrypt, sign, certify and authenticate.
    pub const ESCA: Self = Self {
        encrypt: true,
        sign: true,
        certify: true,
        authenticate: true,
    };

    /// OpenPGP capability letters, e.g. `ESCA`.
    pub fn letters(&self) -> String {
        [
            (self.encrypt, 'E'),
            (self.sign, 'S'),
            (self.certify, 'C'),
            (self.authenticate, 'A'),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, c)| *c)
        .collect()
    }

    /// Usage list in gpg batch parameter syntax, e.g. `encrypt,sign,cert,auth`.
    pub fn gpg_list(&self) -> String {
        let mut parts = Vec::new();
        if self.encrypt {
            parts.push("encrypt");
        }
        if self.sign {
            parts.push("sign");
        }
        if self.certify {
            parts.push("cert");
        }
        if self.authenticate {
            parts.push("auth");
        }
        parts.join(",")
    }
}

/// Key generation request handed to a keyring.
#[derive(Debug, Clone)]
pub struct KeyParams {
    pub key_type: KeyType,
    pub key_length: u32,
    pub usage: KeyUsage,
    pub name_real: String,
    pub passphrase: Passphrase,
}

impl KeyParams {
    /// RSA 2048, full usage, real name set to `name`.
    pub fn for_identity(name: &str, passphrase: &Passphrase) -> Self {
        Self {
            key_type: KeyType::Rsa,
            key_length: constants::KEY_LENGTH,
            usage: KeyUsage::ESCA,
            name_real: name.to_string(),
            passphrase: passphrase.clone(),
        }
    }
}
