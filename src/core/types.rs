//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

/// Unique identifier of a keypair within a keyring (hex digits).
pub type Fingerprint = String;

/// A key user id, e.g. `ci-bot <ci@example.com>`.
///
/// The first whitespace-delimited token is the name keys are matched on.
pub type Uid = String;

/// Base64 envelope text produced by `Encryption::encrypt`.
pub type EnvelopeText = String;
