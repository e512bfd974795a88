//! Encryption envelope contract.
//!
//! `encrypt` always yields base64 text and `decrypt` always accepts it,
//! whatever cipher sits underneath. Implementors supply only the raw hooks;
//! a type that does not implement them does not compile.

use tracing::trace;

use crate::core::codec;
use crate::core::types::EnvelopeText;
use crate::error::{DecryptError, Result};

/// Encrypt-then-encode / decode-then-decrypt over text.
pub trait Encryption {
    /// Backend-specific options, forwarded verbatim to the raw hooks.
    type Options: Default;

    /// Encrypt raw bytes.
    fn encrypt_raw(&self, plaintext: &[u8], options: &Self::Options) -> Result<Vec<u8>>;

    /// Decrypt raw bytes.
    fn decrypt_raw(&self, ciphertext: &[u8], options: &Self::Options) -> Result<Vec<u8>>;

    /// Encrypt `plaintext` and return the base64 envelope.
    fn encrypt(&self, plaintext: &str) -> Result<EnvelopeText> {
        self.encrypt_with(plaintext, &Self::Options::default())
    }

    /// Decrypt a base64 envelope back to text.
    ///
    /// Input that is not base64 is handed to the cipher as-is; a cipher
    /// failure is always returned as `Error::Decrypt`.
    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        self.decrypt_with(ciphertext, &Self::Options::default())
    }

    /// [`Encryption::encrypt`] with explicit backend options.
    fn encrypt_with(&self, plaintext: &str, options: &Self::Options) -> Result<EnvelopeText> {
        let ciphertext = self.encrypt_raw(plaintext.as_bytes(), options)?;
        let envelope = codec::encode(&ciphertext);
        trace!(
            ciphertext_len = ciphertext.len(),
            envelope_len = envelope.len(),
            "sealed envelope"
        );
        Ok(envelope)
    }

    /// [`Encryption::decrypt`] with explicit backend options.
    fn decrypt_with(&self, ciphertext: &str, options: &Self::Options) -> Result<String> {
        let raw = codec::decode(ciphertext);
        let plaintext = self.decrypt_raw(&raw, options)?;
        String::from_utf8(plaintext).map_err(|_| DecryptError::InvalidUtf8.into())
    }
}
