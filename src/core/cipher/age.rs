//! Age keyring backend.
//!
//! Keeps x25519 keypairs under a directory, one TOML record per key:
//!
//! ```toml
//! fingerprint = "3F0A..."
//! uids = ["ci-bot"]
//! algorithm = "x25519"
//! usage = "ESCA"
//! recipient = "age1..."
//! created = "2026-10-18T09:12:44.000000000Z"
//! secret = """
//! -----BEGIN AGE ENCRYPTED FILE-----
//! ...
//! -----END AGE ENCRYPTED FILE-----
//! """
//! ```
//!
//! `secret` is the x25519 identity sealed to the passphrase with age's scrypt
//! recipient. Decryption unseals every record the passphrase opens and tries
//! them all, the way gpg tries every secret key it holds.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ::age::secrecy::{ExposeSecret, SecretString};
use ::age::{armor, scrypt, x25519};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, trace};

use super::{Cipher, Keyring};
use crate::core::constants;
use crate::core::domain::{KeyInfo, KeyParams, KeyType, Passphrase};
use crate::core::types::{Fingerprint, Uid};
use crate::error::{DecryptError, EncryptError, KeyringError};

/// Bytes of the SHA-256 digest kept in a fingerprint.
const FINGERPRINT_BYTES: usize = 20;

/// Options for the age backend.
#[derive(Debug, Clone, Default)]
pub struct AgeOptions {
    /// ASCII-armor the ciphertext before it is base64-encoded.
    pub armor: bool,
}

/// On-disk key record.
#[derive(Debug, Serialize, Deserialize)]
struct KeyRecord {
    fingerprint: Fingerprint,
    uids: Vec<Uid>,
    algorithm: KeyType,
    usage: String,
    recipient: String,
    created: String,
    secret: String,
}

impl KeyRecord {
    fn created_at(&self) -> Result<DateTime<Utc>, KeyringError> {
        DateTime::parse_from_rfc3339(&self.created)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                KeyringError::InvalidFormat(format!("{}: bad created time: {}", self.fingerprint, e))
            })
    }

    fn info(&self) -> KeyInfo {
        KeyInfo::new(self.fingerprint.clone(), self.uids.clone())
    }
}

/// Keyring of age x25519 keys rooted at a directory.
#[derive(Debug, Clone)]
pub struct AgeKeyring {
    dir: PathBuf,
    verbose: bool,
    work_factor: Option<u8>,
}

impl AgeKeyring {
    /// Attach to the keyring at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `KeyringError::WriteFailed` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, verbose: bool) -> Result<Self, KeyringError> {
        let dir = dir.into();
        debug!(path = %dir.display(), "opening age keyring");

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(KeyringError::WriteFailed)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))
                    .map_err(KeyringError::WriteFailed)?;
            }
        }

        Ok(Self {
            dir,
            verbose,
            work_factor: None,
        })
    }

    /// Set the scrypt work factor (log2 of N) used to seal new secret keys.
    ///
    /// Lower values make key generation and decryption faster and brute
    /// forcing cheaper; keep the default outside of tests.
    pub fn with_work_factor(mut self, log_n: u8) -> Self {
        self.work_factor = Some(log_n);
        self
    }

    /// Keyring directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, fingerprint: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", fingerprint, constants::RECORD_EXTENSION))
    }

    fn load_records(&self) -> Result<Vec<KeyRecord>, KeyringError> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.dir).map_err(KeyringError::ReadFailed)? {
            let path = entry.map_err(KeyringError::ReadFailed)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(constants::RECORD_EXTENSION) {
                continue;
            }

            let contents = fs::read_to_string(&path).map_err(KeyringError::ReadFailed)?;
            let record: KeyRecord = toml::from_str(&contents).map_err(|e| {
                KeyringError::InvalidFormat(format!("{}: {}", path.display(), e))
            })?;
            let created = record.created_at()?;
            records.push((created, record));
        }

        records.sort_by(|(a_time, a), (b_time, b)| {
            a_time
                .cmp(b_time)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });

        trace!(count = records.len(), "loaded key records");
        Ok(records.into_iter().map(|(_, r)| r).collect())
    }

    fn load_record(&self, fingerprint: &str) -> Result<Option<KeyRecord>, KeyringError> {
        // fingerprints are hex; anything else cannot name a record file
        if fingerprint.is_empty() || !fingerprint.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(None);
        }

        let path = self.record_path(&fingerprint.to_ascii_uppercase());
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(KeyringError::ReadFailed)?;
        let record = toml::from_str(&contents)
            .map_err(|e| KeyringError::InvalidFormat(format!("{}: {}", path.display(), e)))?;
        Ok(Some(record))
    }

    /// Seal an identity's secret string to the passphrase.
    fn seal(&self, identity: &x25519::Identity, passphrase: &Passphrase) -> Result<String, String> {
        let mut recipient = scrypt::Recipient::new(secret_string(passphrase));
        if let Some(log_n) = self.work_factor {
            recipient.set_work_factor(log_n);
        }

        let secret = identity.to_string();
        let sealed = encrypt_to(&recipient, secret.expose_secret().as_bytes(), true)?;
        String::from_utf8(sealed).map_err(|e| format!("UTF-8 error: {}", e))
    }

    /// Open a record's sealed secret, or `None` if the passphrase is wrong.
    fn unseal(record: &KeyRecord, passphrase: &Passphrase) -> Option<x25519::Identity> {
        let identity = scrypt::Identity::new(secret_string(passphrase));
        let secret = decrypt_with(&[&identity as &dyn ::age::Identity], record.secret.as_bytes()).ok()?;
        let secret = SecretString::from(String::from_utf8(secret).ok()?);
        secret.expose_secret().trim().parse::<x25519::Identity>().ok()
    }
}

impl Keyring for AgeKeyring {
    fn list_keys(&self) -> Result<Vec<KeyInfo>, KeyringError> {
        let keys: Vec<KeyInfo> = self.load_records()?.iter().map(KeyRecord::info).collect();
        if self.verbose {
            info!(path = %self.dir.display(), count = keys.len(), "listed age keys");
        }
        Ok(keys)
    }

    fn generate_key(&self, params: &KeyParams) -> Result<Fingerprint, KeyringError> {
        if params.key_type != KeyType::X25519 {
            debug!(
                requested = %params.key_type,
                length = params.key_length,
                "age keyring generates x25519 keys"
            );
        }

        let identity = x25519::Identity::generate();
        let recipient = identity.to_public();
        let fingerprint = fingerprint(&recipient);

        let path = self.record_path(&fingerprint);
        if path.exists() {
            return Err(KeyringError::GenerationFailed(format!(
                "fingerprint {} already present",
                fingerprint
            )));
        }

        let secret = self
            .seal(&identity, &params.passphrase)
            .map_err(KeyringError::GenerationFailed)?;

        let record = KeyRecord {
            fingerprint: fingerprint.clone(),
            uids: vec![params.name_real.clone()],
            algorithm: KeyType::X25519,
            usage: params.usage.letters(),
            recipient: recipient.to_string(),
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            secret,
        };
        let contents = toml::to_string_pretty(&record)
            .map_err(|e| KeyringError::GenerationFailed(format!("serialize record: {}", e)))?;

        fs::write(&path, contents).map_err(KeyringError::WriteFailed)?;

        // Restrict permissions on key record (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(KeyringError::WriteFailed)?;
        }

        if self.verbose {
            info!(fingerprint = %fingerprint, path = %path.display(), "generated age key");
        } else {
            debug!(fingerprint = %fingerprint, "generated age key");
        }

        Ok(fingerprint)
    }
}

impl Cipher for AgeKeyring {
    type Options = AgeOptions;

    fn name(&self) -> &'static str {
        "age"
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &str,
        options: &AgeOptions,
    ) -> Result<Vec<u8>, EncryptError> {
        trace!(plaintext_len = plaintext.len(), "encrypting with age");

        let record = self
            .load_record(recipient)
            .map_err(|e| EncryptError::Failed(e.to_string()))?
            .ok_or_else(|| EncryptError::UnknownRecipient(recipient.to_string()))?;

        let public = record
            .recipient
            .parse::<x25519::Recipient>()
            .map_err(|e| EncryptError::Failed(format!("invalid recipient in record: {}", e)))?;

        let ciphertext = encrypt_to(&public, plaintext, options.armor).map_err(EncryptError::Failed)?;

        trace!(ciphertext_len = ciphertext.len(), "encrypted with age");
        Ok(ciphertext)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: &Passphrase,
        _options: &AgeOptions,
    ) -> Result<Vec<u8>, DecryptError> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting with age");

        let records = self
            .load_records()
            .map_err(|e| DecryptError::Failed(e.to_string()))?;
        if records.is_empty() {
            return Err(DecryptError::NoSecretKey);
        }

        let identities: Vec<x25519::Identity> = records
            .iter()
            .filter_map(|record| Self::unseal(record, passphrase))
            .collect();
        if identities.is_empty() {
            return Err(DecryptError::BadPassphrase);
        }
        debug!(unlocked = identities.len(), "unsealed secret keys");

        let refs: Vec<&dyn ::age::Identity> = identities
            .iter()
            .map(|i| i as &dyn ::age::Identity)
            .collect();
        let plaintext = decrypt_with(&refs, ciphertext).map_err(|e| match e {
            ::age::DecryptError::NoMatchingKeys => DecryptError::NoSecretKey,
            other => DecryptError::Failed(other.to_string()),
        })?;

        trace!(plaintext_len = plaintext.len(), "decrypted with age");
        Ok(plaintext)
    }
}

/// Fingerprint of a recipient: leading SHA-256 bytes of its string form, hex.
fn fingerprint(recipient: &x25519::Recipient) -> Fingerprint {
    let digest = Sha256::digest(recipient.to_string().as_bytes());
    digest[..FINGERPRINT_BYTES]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect()
}

fn secret_string(passphrase: &Passphrase) -> SecretString {
    SecretString::from(passphrase.expose().to_string())
}

fn encrypt_to(
    recipient: &dyn ::age::Recipient,
    plaintext: &[u8],
    armor: bool,
) -> Result<Vec<u8>, String> {
    let encryptor = ::age::Encryptor::with_recipients(std::iter::once(recipient))
        .map_err(|e| format!("{}", e))?;

    let format = if armor {
        armor::Format::AsciiArmor
    } else {
        armor::Format::Binary
    };

    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(
            armor::ArmoredWriter::wrap_output(&mut encrypted, format).map_err(|e| format!("{}", e))?,
        )
        .map_err(|e| format!("{}", e))?;

    writer.write_all(plaintext).map_err(|e| format!("{}", e))?;
    let armored = writer.finish().map_err(|e| format!("{}", e))?;
    armored.finish().map_err(|e| format!("armor: {}", e))?;

    Ok(encrypted)
}

fn decrypt_with(
    identities: &[&dyn ::age::Identity],
    ciphertext: &[u8],
) -> Result<Vec<u8>, ::age::DecryptError> {
    let reader = armor::ArmoredReader::new(ciphertext);
    let decryptor = ::age::Decryptor::new(reader)?;

    let mut reader = decryptor.decrypt(identities.iter().copied())?;
    let mut decrypted = Vec::new();
    reader.read_to_end(&mut decrypted)?;
    Ok(decrypted)
}
