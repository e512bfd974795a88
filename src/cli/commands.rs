//! Command implementations.
//!
//! Handler functions for each CLI command.

use std::io::{self, IsTerminal, Read};

use clap::CommandFactory;
use tracing::debug;

use crate::cli::{output, Cli, Command};
use crate::core::cipher::{BackendOptions, CipherBackend, Keyring};
use crate::core::config::Settings;
use crate::core::constants;
use crate::core::domain::{KeyInfo, Passphrase};
use crate::core::envelope::Encryption;
use crate::core::provider::{KeyOrigin, Provider};
use crate::error::Result;

/// Execute a command.
///
/// # Errors
///
/// Returns error if the command execution fails.
pub fn execute(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Encrypt { text, armor } => cmd_encrypt(settings, text, armor),
        Command::Decrypt { text } => cmd_decrypt(settings, text),
        Command::Fingerprint => cmd_fingerprint(settings),
        Command::Keys { json } => cmd_keys(settings, json),
        Command::Completions { shell } => cmd_completions(shell),
    }
}

/// Encrypt text and print the envelope.
fn cmd_encrypt(settings: &Settings, text: Option<String>, armor: bool) -> Result<()> {
    let plaintext = match text {
        Some(text) => text,
        None => strip_newline(read_stdin()?),
    };

    let provider = open_provider(settings)?;
    let envelope = provider.encrypt_with(&plaintext, &BackendOptions { armor })?;

    print!("{}", envelope);
    Ok(())
}

/// Decrypt an envelope and print the plaintext.
fn cmd_decrypt(settings: &Settings, text: Option<String>) -> Result<()> {
    let envelope = match text {
        Some(text) => text,
        None => read_stdin()?,
    };

    let provider = open_provider(settings)?;
    let plaintext = provider.decrypt(&envelope)?;

    println!("{}", plaintext);
    Ok(())
}

/// Resolve the named key and print its fingerprint.
fn cmd_fingerprint(settings: &Settings) -> Result<()> {
    let provider = open_provider(settings)?;
    println!("{}", provider.fingerprint());
    Ok(())
}

/// List keyring contents without resolving or creating anything.
fn cmd_keys(settings: &Settings, json: bool) -> Result<()> {
    let backend = CipherBackend::from_settings(settings)?;
    let keys = backend.list_keys()?;
    debug!(count = keys.len(), backend = %backend.kind(), "listed keys");

    if json {
        let json = serde_json::to_string_pretty(&keys).map_err(io::Error::from)?;
        println!("{}", json);
        return Ok(());
    }

    if keys.is_empty() {
        output::dimmed(&format!("no keys in {}", settings.keydir.display()));
        return Ok(());
    }

    output::header(&format!("{} key(s) in {}", keys.len(), settings.keydir.display()));
    for key in &keys {
        println!("{}", key_line(key));
    }
    Ok(())
}

/// One stdout record per key: fingerprint, then its uids.
fn key_line(key: &KeyInfo) -> String {
    if key.uids.is_empty() {
        key.fingerprint.clone()
    } else {
        format!("{}  {}", key.fingerprint, key.uids.join(", "))
    }
}

/// Generate shell completions.
fn cmd_completions(shell: clap_complete::Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "keyward", &mut io::stdout());
    Ok(())
}

/// Resolve the provider for the configured name, reporting a fresh key.
fn open_provider(settings: &Settings) -> Result<Provider<CipherBackend>> {
    let passphrase = read_passphrase()?;
    if passphrase.is_empty() {
        output::warn("passphrase is empty");
    }

    let provider = Provider::from_settings(settings, passphrase)?;
    if provider.origin() == KeyOrigin::Generated {
        output::success(&format!(
            "generated key {} for {}",
            output::fingerprint(provider.fingerprint()),
            provider.name()
        ));
    }
    Ok(provider)
}

/// Passphrase from the environment, else an interactive prompt.
fn read_passphrase() -> Result<Passphrase> {
    if let Ok(passphrase) = std::env::var(constants::PASSPHRASE_ENV) {
        debug!(source = constants::PASSPHRASE_ENV, "passphrase from environment");
        return Ok(Passphrase::new(passphrase));
    }

    let passphrase = dialoguer::Password::new()
        .with_prompt("Passphrase")
        .allow_empty_password(true)
        .interact()?;
    Ok(Passphrase::new(passphrase))
}

fn read_stdin() -> Result<String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        output::hint("reading from stdin, end with Ctrl-D");
    }

    let mut buf = String::new();
    stdin.read_to_string(&mut buf)?;
    Ok(buf)
}

/// Drop the single line ending `echo` and heredocs append.
fn strip_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}
