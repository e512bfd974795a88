//! Encryption provider.
//!
//! A provider owns one resolved keypair and the passphrase that unlocks it.
//! Resolution happens once, in the constructor:
//!
//! ```text
//! Unresolved -> Searching -> Found -------\
//!                         \-> Generating --> Resolved
//! ```
//!
//! Searching lists the keyring and takes the first key with a uid whose
//! first word equals the name, ignoring case. Generating only runs when no
//! key matched, so constructing again with the same keydir and name finds
//! the key made the first time.
//!
//! Searching and generating are two separate backend calls. Two providers
//! constructed at the same time for the same keydir and name can both miss
//! and both generate; callers that construct concurrently must serialize
//! construction per `(keydir, name)` themselves.

use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use crate::core::cipher::{Cipher, CipherBackend, CipherKind, Keyring};
use crate::core::config::Settings;
use crate::core::constants;
use crate::core::domain::{KeyIdentity, KeyInfo, KeyParams, Passphrase};
use crate::core::envelope::Encryption;
use crate::core::types::Fingerprint;
use crate::error::{Error, ProvisionError, Result};

/// Resolution states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Unresolved,
    Searching,
    Found,
    Generating,
    Resolved,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Searching => "searching",
            Self::Found => "found",
            Self::Generating => "generating",
            Self::Resolved => "resolved",
        }
    }
}

/// How the provider's key was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// An existing key matched the name.
    Found,
    /// No key matched; one was generated.
    Generated,
}

/// Provider bound to one keypair.
pub struct Provider<B> {
    backend: B,
    identity: KeyIdentity,
    passphrase: Passphrase,
    origin: KeyOrigin,
}

impl<B: fmt::Debug> fmt::Debug for Provider<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("backend", &self.backend)
            .field("identity", &self.identity)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl<B: Cipher + Keyring> Provider<B> {
    /// Resolve the keypair for `name` in `backend`, generating one if none
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provision` if the name is unusable, the keyring cannot
    /// be listed, or generation fails. No provider is returned in that case.
    pub fn new(backend: B, name: &str, passphrase: impl Into<Passphrase>) -> Result<Self> {
        let passphrase = passphrase.into();
        validate_name(name)?;

        let mut state = Resolution::Unresolved;
        debug!(name = %name, backend = backend.name(), state = state.as_str(), "resolving key");

        state = Resolution::Searching;
        debug!(state = state.as_str(), "listing keys");
        let keys = backend.list_keys().map_err(ProvisionError::ListKeys)?;

        let (fingerprint, origin) = match find_key(&keys, name) {
            Some(key) => {
                state = Resolution::Found;
                debug!(state = state.as_str(), fingerprint = %key.fingerprint, "key found");
                (key.fingerprint.clone(), KeyOrigin::Found)
            }
            None => {
                state = Resolution::Generating;
                debug!(state = state.as_str(), searched = keys.len(), "no key matched");
                let fingerprint = generate(&backend, name, &passphrase)?;
                info!(name = %name, fingerprint = %fingerprint, "generated new key");
                (fingerprint, KeyOrigin::Generated)
            }
        };

        state = Resolution::Resolved;
        debug!(state = state.as_str(), fingerprint = %fingerprint, "key resolved");

        Ok(Self {
            backend,
            identity: KeyIdentity {
                name: name.to_string(),
                fingerprint,
            },
            passphrase,
            origin,
        })
    }
}

impl<B> Provider<B> {
    /// Name the provider was constructed with.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Fingerprint of the resolved keypair.
    pub fn fingerprint(&self) -> &str {
        &self.identity.fingerprint
    }

    pub fn identity(&self) -> &KeyIdentity {
        &self.identity
    }

    /// Whether construction found an existing key or generated one.
    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl Provider<CipherBackend> {
    /// Open a provider on the default backend.
    ///
    /// `keydir` defaults to `/etc/commissaire/gpg`; `verbose` makes the
    /// backend log each keyring operation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provision` if the keyring cannot be opened or
    /// provisioning fails.
    pub fn open(
        name: &str,
        passphrase: impl Into<Passphrase>,
        keydir: Option<&Path>,
        verbose: bool,
    ) -> Result<Self> {
        validate_name(name)?;
        let keydir = keydir.unwrap_or_else(|| Path::new(constants::DEFAULT_KEYDIR));
        let backend =
            CipherBackend::open(CipherKind::default(), keydir, verbose).map_err(open_failed)?;
        Self::new(backend, name, passphrase)
    }

    /// Open a provider as described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the backend is not compiled in, and
    /// `Error::Provision` if the keyring cannot be opened or provisioning
    /// fails.
    pub fn from_settings(settings: &Settings, passphrase: impl Into<Passphrase>) -> Result<Self> {
        let backend = CipherBackend::from_settings(settings).map_err(open_failed)?;
        Self::new(backend, &settings.name(), passphrase)
    }
}

impl<B: Cipher + Keyring> Encryption for Provider<B> {
    type Options = B::Options;

    fn encrypt_raw(&self, plaintext: &[u8], options: &B::Options) -> Result<Vec<u8>> {
        Ok(self
            .backend
            .encrypt(plaintext, &self.identity.fingerprint, options)?)
    }

    fn decrypt_raw(&self, ciphertext: &[u8], options: &B::Options) -> Result<Vec<u8>> {
        Ok(self.backend.decrypt(ciphertext, &self.passphrase, options)?)
    }
}

/// First key in listing order with a uid matching `name`.
///
/// Later matches are not checked; if a keyring holds several keys for the
/// same name, the first listed wins.
pub fn find_key<'a>(keys: &'a [KeyInfo], name: &str) -> Option<&'a KeyInfo> {
    keys.iter()
        .find(|key| !key.fingerprint.is_empty() && key.matches(name))
}

/// Keyring failures while opening the backend are part of construction.
fn open_failed(err: Error) -> Error {
    match err {
        Error::Keyring(source) => ProvisionError::Open(source).into(),
        other => other,
    }
}

fn generate<B: Keyring>(backend: &B, name: &str, passphrase: &Passphrase) -> Result<Fingerprint> {
    let params = KeyParams::for_identity(name, passphrase);
    let fingerprint = backend
        .generate_key(&params)
        .map_err(|source| ProvisionError::Generate {
            name: name.to_string(),
            source,
        })?;

    if fingerprint.trim().is_empty() {
        return Err(ProvisionError::EmptyFingerprint {
            name: name.to_string(),
        }
        .into());
    }
    Ok(fingerprint)
}

/// Names are matched on a uid's first word, so a name with whitespace could
/// never be found again and would get a new key on every construction.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(ProvisionError::InvalidName(name.to_string()).into());
    }
    Ok(())
}
