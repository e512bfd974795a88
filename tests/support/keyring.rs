//! Keyring helpers for library-level tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use keyward::core::cipher::{AgeKeyring, AgeOptions, Cipher, Keyring};
use keyward::core::domain::{KeyInfo, KeyParams, Passphrase};
use keyward::core::types::Fingerprint;
use keyward::error::{DecryptError, EncryptError, KeyringError};

use super::TEST_WORK_FACTOR;

/// Open a fast age keyring at `dir`.
pub fn age_keyring(dir: &Path) -> AgeKeyring {
    AgeKeyring::open(dir, false)
        .expect("failed to open keyring")
        .with_work_factor(TEST_WORK_FACTOR)
}

/// Keyring wrapper counting calls to the backend.
#[derive(Debug)]
pub struct Counting<K> {
    pub inner: K,
    pub listed: AtomicUsize,
    pub generated: AtomicUsize,
}

impl<K> Counting<K> {
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            listed: AtomicUsize::new(0),
            generated: AtomicUsize::new(0),
        }
    }

    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    pub fn listed(&self) -> usize {
        self.listed.load(Ordering::SeqCst)
    }
}

impl<K: Keyring> Keyring for Counting<K> {
    fn list_keys(&self) -> Result<Vec<KeyInfo>, KeyringError> {
        self.listed.fetch_add(1, Ordering::SeqCst);
        self.inner.list_keys()
    }

    fn generate_key(&self, params: &KeyParams) -> Result<Fingerprint, KeyringError> {
        self.generated.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_key(params)
    }
}

impl Cipher for Counting<AgeKeyring> {
    type Options = AgeOptions;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &str,
        options: &AgeOptions,
    ) -> Result<Vec<u8>, EncryptError> {
        self.inner.encrypt(plaintext, recipient, options)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: &Passphrase,
        options: &AgeOptions,
    ) -> Result<Vec<u8>, DecryptError> {
        self.inner.decrypt(ciphertext, passphrase, options)
    }
}

/// Lock serializing provider construction for one `(keydir, name)` pair.
pub fn construction_lock(keydir: &Path, name: &str) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<(PathBuf, String), Arc<Mutex<()>>>>> = OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .expect("lock map poisoned");
    locks
        .entry((keydir.to_path_buf(), name.to_lowercase()))
        .or_default()
        .clone()
}
