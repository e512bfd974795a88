//! Error types.
//!
//! Each concern gets its own enum; `Error` wraps them all so library callers
//! can match on the kind of failure while the CLI only prints the message.
//!
//! None of these types ever carry a passphrase or key material.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    /// Finding or generating the provider's keypair failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// The backend could not encrypt.
    #[error(transparent)]
    Encrypt(#[from] EncryptError),

    /// The backend could not decrypt.
    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    /// Keyring access outside of provisioning (e.g. `keys` listing).
    #[error(transparent)]
    Keyring(#[from] KeyringError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Key provisioning failures during provider construction.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("invalid key name '{0}': must be non-empty with no whitespace")]
    InvalidName(String),

    /// The backend's keyring could not be opened (missing gpg, unwritable
    /// keydir).
    #[error("failed to open keyring: {0}")]
    Open(#[source] KeyringError),

    #[error("failed to list keys: {0}")]
    ListKeys(#[source] KeyringError),

    #[error("failed to generate key for '{name}': {source}")]
    Generate {
        name: String,
        #[source]
        source: KeyringError,
    },

    #[error("backend returned an empty fingerprint for '{name}'")]
    EmptyFingerprint { name: String },
}

/// Encryption failures.
#[derive(Error, Debug)]
pub enum EncryptError {
    #[error("no key with fingerprint {0} in keyring")]
    UnknownRecipient(String),

    #[error("encryption failed: {0}")]
    Failed(String),
}

/// Decryption failures.
///
/// These are strict: the envelope layer is lenient about base64, the cipher
/// layer is not.
#[derive(Error, Debug)]
pub enum DecryptError {
    #[error("decryption failed: bad passphrase")]
    BadPassphrase,

    #[error("decryption failed: no secret key for this ciphertext")]
    NoSecretKey,

    #[error("decryption failed: {0}")]
    Failed(String),

    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,
}

/// Keyring (backend storage) failures.
#[derive(Error, Debug)]
pub enum KeyringError {
    #[error("keyring unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read keyring: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("failed to write keyring: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("invalid key record: {0}")]
    InvalidFormat(String),

    #[error("key generation failed: {0}")]
    GenerationFailed(String),
}

/// Settings file and option failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("{0} support not compiled. Rebuild with: cargo install keyward --features {0}")]
    BackendNotCompiled(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
