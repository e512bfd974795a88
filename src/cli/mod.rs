//! Command-line interface.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::cipher::CipherKind;
use crate::core::config::Settings;
use crate::error::Result;

pub use commands::execute;

/// Keyward - encrypt and decrypt text with a named keypair.
#[derive(Parser)]
#[command(
    name = "keyward",
    about = "Encrypt and decrypt text with a named keypair, created on first use",
    version
)]
pub struct Cli {
    /// Settings file (default: /etc/commissaire/keyward.toml if present)
    #[arg(long, global = true, env = "KEYWARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Key name (default: settings file, then current user)
    #[arg(short, long, global = true, env = "KEYWARD_NAME")]
    pub name: Option<String>,

    /// Keyring directory
    #[arg(short, long, global = true, env = "KEYWARD_KEYDIR")]
    pub keydir: Option<PathBuf>,

    /// Cipher backend
    #[arg(short, long, global = true, env = "KEYWARD_BACKEND", value_enum)]
    pub backend: Option<CipherKind>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Settings from the settings file with command-line overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be loaded or the merged
    /// values are invalid.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::discover(self.config.as_deref())?;

        if let Some(name) = &self.name {
            settings.name = Some(name.clone());
        }
        if let Some(keydir) = &self.keydir {
            settings.keydir = keydir.clone();
        }
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        settings.verbose |= self.verbose;

        settings.validate()?;
        Ok(settings)
    }
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Encrypt text to the named key and print the base64 envelope
    Encrypt {
        /// Text to encrypt (default: read stdin, minus one trailing newline)
        text: Option<String>,
        /// ASCII-armor the ciphertext inside the envelope
        #[arg(long)]
        armor: bool,
    },

    /// Decrypt a base64 envelope with the named key
    Decrypt {
        /// Envelope to decrypt (default: read stdin)
        text: Option<String>,
    },

    /// Print the fingerprint of the named key, creating the key if needed
    Fingerprint,

    /// List keys in the keyring
    Keys {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
