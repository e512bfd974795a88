//! Keyward - encrypt and decrypt text with a named keypair.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keyward::cli::output;
use keyward::cli::{execute, Cli};
use keyward::core::constants;
use keyward::error::{ConfigError, DecryptError, Error, KeyringError, ProvisionError};

fn main() {
    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env(constants::LOG_ENV).unwrap_or_else(|_| {
        if settings.verbose {
            EnvFilter::new("keyward=debug")
        } else {
            EnvFilter::new("keyward=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .init();

    if let Err(e) = execute(cli.command, &settings) {
        fail(&e);
    }
}

/// Print the error with a suggestion if one applies, then exit 1.
fn fail(e: &Error) -> ! {
    let suggestion = match e {
        Error::Decrypt(DecryptError::BadPassphrase) => {
            Some("check that KEYWARD_PASSPHRASE matches the key's passphrase")
        }
        Error::Decrypt(DecryptError::NoSecretKey) => {
            Some("the envelope was encrypted for a key outside --keydir")
        }
        Error::Provision(ProvisionError::ListKeys(KeyringError::Unavailable(_)))
        | Error::Provision(ProvisionError::Open(KeyringError::Unavailable(_)))
        | Error::Keyring(KeyringError::Unavailable(_)) => {
            Some("install gnupg or pass --backend age")
        }
        Error::Provision(ProvisionError::InvalidName(_))
        | Error::Config(ConfigError::InvalidValue { field: "name", .. }) => {
            Some("pass a single-word name with --name")
        }
        _ => None,
    };

    output::error(&e.to_string());
    if let Some(hint) = suggestion {
        output::hint(hint);
    }
    std::process::exit(1);
}
