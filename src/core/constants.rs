//! Constants used throughout keyward.
//!
//! Centralizes paths, environment variable names and key defaults.

/// Default keyring directory.
pub const DEFAULT_KEYDIR: &str = "/etc/commissaire/gpg";

/// Default settings file, read when present.
pub const DEFAULT_CONFIG: &str = "/etc/commissaire/keyward.toml";

/// Environment variable holding the passphrase for non-interactive use.
pub const PASSPHRASE_ENV: &str = "KEYWARD_PASSPHRASE";

/// Environment variable for the tracing filter.
pub const LOG_ENV: &str = "KEYWARD_LOG";

/// Length in bits requested for generated keys.
pub const KEY_LENGTH: u32 = 2048;

/// Extension of age keyring records.
pub const RECORD_EXTENSION: &str = "toml";
