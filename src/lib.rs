//! Keyward - find-or-create keypair provider with base64 encryption envelopes.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── error             # Error enums
//! ├── cli/              # Command-line interface
//! │   ├── commands      # encrypt, decrypt, fingerprint, keys, completions
//! │   └── output        # Terminal styling
//! └── core/             # Core library components
//!     ├── codec         # base64 envelope encoding
//!     ├── envelope      # Encryption trait (encrypt-then-encode)
//!     ├── provider      # Keypair resolution by name
//!     ├── config        # keyward.toml settings
//!     ├── constants     # Defaults and environment variable names
//!     ├── types         # Fingerprint and uid aliases
//!     ├── cipher/       # Cipher backends
//!     │   ├── mod       # Cipher and Keyring traits
//!     │   ├── age       # Native age keyring
//!     │   ├── gpg       # GnuPG via the gpg CLI
//!     │   └── backend   # Runtime backend selection
//!     └── domain/       # Key and passphrase types
//! ```
//!
//! # Example
//!
//! ```no_run
//! use keyward::Encryption;
//!
//! # fn main() -> keyward::Result<()> {
//! let provider = keyward::new_provider("ci-bot", "p@ss", None, false)?;
//! let envelope = provider.encrypt("hello")?;
//! assert_eq!(provider.decrypt(&envelope)?, "hello");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod core;
pub mod error;

use std::path::Path;

pub use crate::core::cipher::{CipherBackend, CipherKind};
pub use crate::core::domain::Passphrase;
pub use crate::core::envelope::Encryption;
pub use crate::core::provider::{KeyOrigin, Provider};
pub use crate::error::{Error, Result};

/// Resolve or create the keypair for `name` and return a provider for it.
///
/// Uses the default backend (gpg when compiled in, age otherwise) rooted at
/// `keydir`, or `/etc/commissaire/gpg` when `keydir` is `None`.
///
/// # Errors
///
/// Returns `Error::Provision` if the keyring cannot be opened or the key
/// cannot be found or generated.
pub fn new_provider(
    name: &str,
    passphrase: impl Into<Passphrase>,
    keydir: Option<&Path>,
    verbose: bool,
) -> Result<Provider<CipherBackend>> {
    Provider::open(name, passphrase, keydir, verbose)
}
