//! Cryptographic backends.
//!
//! Public-key primitives live behind two traits: [`Cipher`] encrypts to a
//! fingerprint and decrypts with a passphrase, [`Keyring`] lists and
//! generates keypairs. A provider needs a backend implementing both.
//!
//! ## Backends
//!
//! - **age**: Always available. x25519 keypairs stored as TOML records, secret
//!   half sealed with the passphrase.
//! - **GPG**: Feature-gated (`gpg`, on by default). Uses GnuPG via the gpg CLI.
//!
//! ## Adding a New Backend
//!
//! 1. Implement `Cipher` and `Keyring`
//! 2. Add the implementation in a new file
//! 3. Feature-gate if appropriate
//! 4. Add a variant to `CipherBackend` and `CipherKind`

use crate::core::domain::{KeyInfo, KeyParams, Passphrase};
use crate::core::types::Fingerprint;
use crate::error::{DecryptError, EncryptError, KeyringError};

mod age;
mod backend;

#[cfg(feature = "gpg")]
pub mod gpg;

pub use age::{AgeKeyring, AgeOptions};
pub use backend::{BackendOptions, CipherBackend, CipherKind};

#[cfg(feature = "gpg")]
pub use gpg::{Gpg, GpgOptions};

/// Encryption and decryption over raw bytes.
///
/// Implementations produce and consume raw ciphertext; text-safe encoding is
/// the envelope's job, not the backend's.
pub trait Cipher {
    /// Backend-specific options forwarded untouched from the envelope calls.
    type Options: Default;

    /// Encrypt `plaintext` to the key identified by `recipient`.
    ///
    /// # Errors
    ///
    /// Returns `EncryptError::UnknownRecipient` if the keyring has no such key.
    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &str,
        options: &Self::Options,
    ) -> Result<Vec<u8>, EncryptError>;

    /// Decrypt `ciphertext` with whichever secret key `passphrase` unlocks.
    ///
    /// # Errors
    ///
    /// Returns `DecryptError` on a bad passphrase, a foreign or corrupted
    /// ciphertext, or a missing secret key.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: &Passphrase,
        options: &Self::Options,
    ) -> Result<Vec<u8>, DecryptError>;

    /// Backend name for display/config.
    fn name(&self) -> &'static str;
}

/// Keypair storage.
pub trait Keyring {
    /// All keys, in the backend's listing order.
    fn list_keys(&self) -> Result<Vec<KeyInfo>, KeyringError>;

    /// Generate a keypair and return its fingerprint.
    fn generate_key(&self, params: &KeyParams) -> Result<Fingerprint, KeyringError>;
}

impl<T: Cipher + ?Sized> Cipher for &T {
    type Options = T::Options;

    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &str,
        options: &Self::Options,
    ) -> Result<Vec<u8>, EncryptError> {
        (**self).encrypt(plaintext, recipient, options)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: &Passphrase,
        options: &Self::Options,
    ) -> Result<Vec<u8>, DecryptError> {
        (**self).decrypt(ciphertext, passphrase, options)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<T: Keyring + ?Sized> Keyring for &T {
    fn list_keys(&self) -> Result<Vec<KeyInfo>, KeyringError> {
        (**self).list_keys()
    }

    fn generate_key(&self, params: &KeyParams) -> Result<Fingerprint, KeyringError> {
        (**self).generate_key(params)
    }
}
