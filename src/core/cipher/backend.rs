//! Cipher backend selection and dispatch.
//!
//! `CipherKind` is what settings and the CLI name; `CipherBackend` is the
//! opened keyring, dispatching `Cipher` and `Keyring` calls to it.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AgeKeyring, AgeOptions, Cipher, Keyring};
use crate::core::config::Settings;
use crate::core::domain::{KeyInfo, KeyParams, Passphrase};
use crate::core::types::Fingerprint;
use crate::error::{ConfigError, DecryptError, EncryptError, KeyringError, Result};

#[cfg(feature = "gpg")]
use super::{Gpg, GpgOptions};

/// Backend names accepted in settings and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CipherKind {
    Age,
    Gpg,
}

impl CipherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Gpg => "gpg",
        }
    }
}

impl Default for CipherKind {
    /// gpg when compiled in, age otherwise.
    fn default() -> Self {
        if cfg!(feature = "gpg") {
            Self::Gpg
        } else {
            Self::Age
        }
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "age" => Ok(Self::Age),
            "gpg" => Ok(Self::Gpg),
            other => Err(ConfigError::InvalidValue {
                field: "backend",
                reason: format!("unknown cipher: {}. Supported: age, gpg", other),
            }),
        }
    }
}

/// Options understood by every backend.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// ASCII-armor the ciphertext before it is base64-encoded.
    pub armor: bool,
}

/// Opened cipher backend.
#[derive(Debug)]
pub enum CipherBackend {
    /// age keyring (always available)
    Age(AgeKeyring),

    /// GPG keyring via gpg CLI
    #[cfg(feature = "gpg")]
    Gpg(Gpg),
}

impl CipherBackend {
    /// Open the keyring of `kind` at `keydir`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::BackendNotCompiled` when gpg is requested without
    /// the `gpg` feature, or a `KeyringError` if the keyring cannot be opened.
    pub fn open(kind: CipherKind, keydir: &Path, verbose: bool) -> Result<Self> {
        match kind {
            CipherKind::Age => {
                debug!("creating age cipher backend");
                Ok(Self::Age(AgeKeyring::open(keydir, verbose)?))
            }
            CipherKind::Gpg => {
                #[cfg(feature = "gpg")]
                {
                    debug!("creating gpg cipher backend");
                    Ok(Self::Gpg(Gpg::open(keydir, verbose)?))
                }
                #[cfg(not(feature = "gpg"))]
                {
                    let _ = (keydir, verbose);
                    Err(ConfigError::BackendNotCompiled("gpg").into())
                }
            }
        }
    }

    /// Open the backend described by `settings`.
    ///
    /// # Errors
    ///
    /// Same as [`CipherBackend::open`].
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = Self::open(settings.backend, &settings.keydir, settings.verbose)?;
        Ok(match (backend, settings.age.work_factor) {
            (Self::Age(age), Some(log_n)) => Self::Age(age.with_work_factor(log_n)),
            (backend, _) => backend,
        })
    }

    pub fn kind(&self) -> CipherKind {
        match self {
            Self::Age(_) => CipherKind::Age,
            #[cfg(feature = "gpg")]
            Self::Gpg(_) => CipherKind::Gpg,
        }
    }
}

impl From<AgeKeyring> for CipherBackend {
    fn from(keyring: AgeKeyring) -> Self {
        Self::Age(keyring)
    }
}

#[cfg(feature = "gpg")]
impl From<Gpg> for CipherBackend {
    fn from(gpg: Gpg) -> Self {
        Self::Gpg(gpg)
    }
}

impl Keyring for CipherBackend {
    fn list_keys(&self) -> std::result::Result<Vec<KeyInfo>, KeyringError> {
        match self {
            Self::Age(age) => age.list_keys(),
            #[cfg(feature = "gpg")]
            Self::Gpg(gpg) => gpg.list_keys(),
        }
    }

    fn generate_key(&self, params: &KeyParams) -> std::result::Result<Fingerprint, KeyringError> {
        match self {
            Self::Age(age) => age.generate_key(params),
            #[cfg(feature = "gpg")]
            Self::Gpg(gpg) => gpg.generate_key(params),
        }
    }
}

impl Cipher for CipherBackend {
    type Options = BackendOptions;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &str,
        options: &BackendOptions,
    ) -> std::result::Result<Vec<u8>, EncryptError> {
        match self {
            Self::Age(age) => age.encrypt(plaintext, recipient, &AgeOptions { armor: options.armor }),
            #[cfg(feature = "gpg")]
            Self::Gpg(gpg) => gpg.encrypt(
                plaintext,
                recipient,
                &GpgOptions {
                    armor: options.armor,
                    ..GpgOptions::default()
                },
            ),
        }
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: &Passphrase,
        _options: &BackendOptions,
    ) -> std::result::Result<Vec<u8>, DecryptError> {
        match self {
            Self::Age(age) => age.decrypt(ciphertext, passphrase, &AgeOptions::default()),
            #[cfg(feature = "gpg")]
            Self::Gpg(gpg) => gpg.decrypt(ciphertext, passphrase, &GpgOptions::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("age".parse::<CipherKind>().unwrap(), CipherKind::Age);
        assert_eq!("GPG".parse::<CipherKind>().unwrap(), CipherKind::Gpg);
        assert!("rot13".parse::<CipherKind>().is_err());
    }

    #[test]
    fn test_kind_default_follows_features() {
        let expected = if cfg!(feature = "gpg") {
            CipherKind::Gpg
        } else {
            CipherKind::Age
        };
        assert_eq!(CipherKind::default(), expected);
    }

    #[test]
    fn test_age_backend_dispatch() {
        let dir = TempDir::new().unwrap();
        let backend = CipherBackend::open(CipherKind::Age, dir.path(), false).unwrap();
        assert_eq!(backend.kind(), CipherKind::Age);
        assert_eq!(backend.name(), "age");
        assert!(backend.list_keys().unwrap().is_empty());
    }

    #[test]
    fn test_age_backend_roundtrip() {
        let dir = TempDir::new().unwrap();
        let backend: CipherBackend = AgeKeyring::open(dir.path(), false)
            .unwrap()
            .with_work_factor(2)
            .into();
        let passphrase = Passphrase::from("p@ss");
        let fpr = backend
            .generate_key(&KeyParams::for_identity("ci-bot", &passphrase))
            .unwrap();

        let options = BackendOptions::default();
        let ciphertext = backend.encrypt(b"dispatch", &fpr, &options).unwrap();
        let plaintext = backend.decrypt(&ciphertext, &passphrase, &options).unwrap();
        assert_eq!(plaintext, b"dispatch");
    }

    #[cfg(not(feature = "gpg"))]
    #[test]
    fn test_gpg_not_compiled() {
        let dir = TempDir::new().unwrap();
        let err = CipherBackend::open(CipherKind::Gpg, dir.path(), false).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Config(ConfigError::BackendNotCompiled("gpg"))
        ));
    }
}
