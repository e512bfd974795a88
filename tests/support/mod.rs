//! Test support utilities for keyward integration tests.
//!
//! Provides isolated keyrings, binary helpers and assertions.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod keyring;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use keyring::*;

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// scrypt work factor for test keyrings. Low enough to keep tests fast.
pub const TEST_WORK_FACTOR: u8 = 10;

/// Passphrase used by the binary helpers.
pub const PASSPHRASE: &str = "p@ss";

/// Test environment with an isolated keyring directory and settings file.
///
/// Nothing process-global is touched: the binary gets its settings through
/// `KEYWARD_CONFIG` on the child process only.
pub struct Test {
    /// Root temp dir holding the settings file and keyring
    pub dir: TempDir,
    /// Keyring directory (created by the first command that needs it)
    pub keydir: PathBuf,
    /// Settings file
    pub config: PathBuf,
}

impl Test {
    /// Create a test environment on the age backend.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let keydir = dir.path().join("keys");
        let config = dir.path().join("keyward.toml");

        let settings = format!(
            "name = \"ci-bot\"\nkeydir = \"{}\"\nbackend = \"age\"\n\n[age]\nwork_factor = {}\n",
            keydir.display(),
            TEST_WORK_FACTOR
        );
        std::fs::write(&config, settings).expect("failed to write settings");

        Self {
            dir,
            keydir,
            config,
        }
    }

    /// Number of key records in the keyring directory.
    pub fn key_count(&self) -> usize {
        count_records(&self.keydir)
    }
}

/// Count `.toml` key records under `dir`.
pub fn count_records(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("toml"))
                .count()
        })
        .unwrap_or(0)
}
