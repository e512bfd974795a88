//! Settings file management.
//!
//! Handles reading and validating the optional `keyward.toml` settings file:
//!
//! ```toml
//! name = "ci-bot"
//! keydir = "/etc/commissaire/gpg"
//! backend = "gpg"
//! verbose = false
//!
//! [age]
//! work_factor = 18
//! ```
//!
//! Every field is optional. Command-line flags and environment variables
//! override what the file says.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::cipher::CipherKind;
use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Largest accepted scrypt work factor (log2 of N).
///
/// Every unseal runs scrypt at this cost; 2^22 already takes seconds and
/// 4 GiB at 2^30.
const MAX_WORK_FACTOR: u8 = 22;

/// Provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Key name; defaults to the current user
    pub name: Option<String>,
    /// Keyring directory
    pub keydir: PathBuf,
    /// Cipher backend
    pub backend: CipherKind,
    /// Log every keyring operation
    pub verbose: bool,
    /// age backend tuning
    pub age: AgeSettings,
}

/// Settings specific to the age backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgeSettings {
    /// scrypt work factor for sealing new secret keys
    pub work_factor: Option<u8>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: None,
            keydir: PathBuf::from(constants::DEFAULT_KEYDIR),
            backend: CipherKind::default(),
            verbose: false,
            age: AgeSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` if the file cannot be read,
    /// `ConfigError::Parse` if the TOML is malformed, or
    /// `ConfigError::InvalidValue` if validation fails.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading settings");

        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let settings = Self::parse(&contents)?;

        debug!(
            backend = %settings.backend,
            keydir = %settings.keydir.display(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` or `ConfigError::InvalidValue`.
    pub fn parse(contents: &str) -> Result<Self> {
        let settings: Self = toml::from_str(contents).map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `path` if given, else the default settings file if it exists,
    /// else built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit or existing file cannot be loaded.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default = Path::new(constants::DEFAULT_CONFIG);
        if default.exists() {
            return Self::load(default);
        }

        debug!("no settings file, using defaults");
        Ok(Self::default())
    }

    /// Configured key name, or the current user's name.
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(whoami::username)
    }

    /// Validate field values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` on the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidValue {
                    field: "name",
                    reason: format!("'{}' must be non-empty with no whitespace", name),
                }
                .into());
            }
        }

        if self.keydir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "keydir",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if let Some(log_n) = self.age.work_factor {
            if log_n == 0 || log_n > MAX_WORK_FACTOR {
                return Err(ConfigError::InvalidValue {
                    field: "age.work_factor",
                    reason: format!("{} is outside 1..={}", log_n, MAX_WORK_FACTOR),
                }
                .into());
            }
        }

        Ok(())
    }
}
