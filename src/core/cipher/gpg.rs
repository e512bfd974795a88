//! GPG cipher backend.
//!
//! Drives GnuPG (GNU Privacy Guard) through the gpg CLI, with the keyring
//! rooted at `keydir` via `--homedir`. Enable with `--features gpg` (on by
//! default).
//!
//! ## Requirements
//!
//! - `gpg` CLI must be installed and on `PATH`
//! - GnuPG 2.1+ for `--pinentry-mode loopback`
//!
//! The passphrase only ever travels over stdin; it never appears in
//! arguments, temp files or logs.
//!
//! Opening a keyring turns off gpg-agent's passphrase cache for it, so every
//! decryption checks the passphrase it is given.

use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, trace};

use super::{Cipher, Keyring};
use crate::core::domain::{KeyInfo, KeyParams, Passphrase};
use crate::core::types::Fingerprint;
use crate::error::{DecryptError, EncryptError, KeyringError};

/// Options for the gpg backend.
#[derive(Debug, Clone)]
pub struct GpgOptions {
    /// ASCII-armor the ciphertext before it is base64-encoded.
    pub armor: bool,
    /// Pass `--trust-model always` so freshly generated keys are usable.
    pub always_trust: bool,
}

impl Default for GpgOptions {
    fn default() -> Self {
        Self {
            armor: false,
            always_trust: true,
        }
    }
}

/// gpg-agent options written to `<homedir>/gpg-agent.conf`.
const AGENT_OPTIONS: &[&str] = &[
    "default-cache-ttl 0",
    "max-cache-ttl 0",
    "allow-loopback-pinentry",
];

/// GPG cipher backend using gpg CLI
#[derive(Debug, Clone)]
pub struct Gpg {
    program: PathBuf,
    homedir: PathBuf,
    verbose: bool,
}

/// Captured output of one gpg run.
struct Run {
    success: bool,
    stdout: Vec<u8>,
    stderr: String,
}

impl Gpg {
    /// Attach to the keyring at `homedir`.
    ///
    /// # Errors
    ///
    /// Returns `KeyringError::Unavailable` if gpg is not installed, or
    /// `KeyringError::WriteFailed` if the directory or the agent settings
    /// cannot be written.
    pub fn open(homedir: impl Into<PathBuf>, verbose: bool) -> Result<Self, KeyringError> {
        let homedir = homedir.into();
        let program = which::which("gpg").map_err(|_| {
            KeyringError::Unavailable(
                "gpg CLI not found. Install GnuPG from https://gnupg.org/download/".to_string(),
            )
        })?;
        debug!(gpg = %program.display(), homedir = %homedir.display(), "opening gpg keyring");

        if !homedir.exists() {
            fs::create_dir_all(&homedir).map_err(KeyringError::WriteFailed)?;

            // gpg warns about unsafe permissions on the home directory
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&homedir, fs::Permissions::from_mode(0o700))
                    .map_err(KeyringError::WriteFailed)?;
            }
        }

        let gpg = Self {
            program,
            homedir,
            verbose,
        };
        gpg.configure_agent()?;
        Ok(gpg)
    }

    /// Make sure the agent for this homedir never caches passphrases.
    ///
    /// Appends whatever [`AGENT_OPTIONS`] are missing and asks a running
    /// agent to reload; later lines win over earlier ones in the file.
    fn configure_agent(&self) -> Result<(), KeyringError> {
        let path = self.homedir.join("gpg-agent.conf");
        let mut contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(KeyringError::ReadFailed(e)),
        };

        let missing: Vec<&str> = AGENT_OPTIONS
            .iter()
            .copied()
            .filter(|option| !contents.lines().any(|line| line.trim() == *option))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        for option in missing {
            contents.push_str(option);
            contents.push('\n');
        }
        fs::write(&path, contents).map_err(KeyringError::WriteFailed)?;
        debug!(path = %path.display(), "disabled gpg-agent passphrase cache");

        self.reload_agent();
        Ok(())
    }

    /// Ask a running agent to re-read its settings. No agent, no-op.
    fn reload_agent(&self) {
        let Ok(gpgconf) = which::which("gpgconf") else {
            return;
        };
        let status = Command::new(gpgconf)
            .arg("--homedir")
            .arg(&self.homedir)
            .args(["--reload", "gpg-agent"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        trace!(?status, "reloaded gpg-agent");
    }

    /// Keyring directory.
    pub fn homedir(&self) -> &Path {
        &self.homedir
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--homedir")
            .arg(&self.homedir)
            .args(["--batch", "--no-tty", "--yes"])
            .arg(if self.verbose { "--verbose" } else { "--quiet" });
        cmd
    }

    /// Run gpg with `args`, feeding `input` on stdin.
    ///
    /// stdin is written from its own thread while stdout and stderr drain,
    /// so gpg never blocks on a full pipe whatever the input size.
    fn run<I, S>(&self, args: I, input: &[u8]) -> io::Result<Run>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command();
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if self.verbose {
            let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy()).collect();
            info!(args = %args.join(" "), "running gpg");
        }

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();

        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                // dropping stdin at the end closes the pipe
                Some(mut stdin) => stdin.write_all(input),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "stdin writer panicked")));
            (written, output)
        });
        let output = output?;

        // gpg may exit before reading all input; its exit status says why
        match written {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                trace!("gpg closed stdin early");
            }
            other => other?,
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if self.verbose && !stderr.is_empty() {
            info!(stderr = %stderr, "gpg stderr");
        } else {
            trace!(status = %output.status, "gpg finished");
        }

        Ok(Run {
            success: output.status.success(),
            stdout: output.stdout,
            stderr,
        })
    }
}

impl Keyring for Gpg {
    fn list_keys(&self) -> Result<Vec<KeyInfo>, KeyringError> {
        let run = self
            .run(["--list-keys", "--with-colons", "--fixed-list-mode"], &[])
            .map_err(KeyringError::ReadFailed)?;

        if !run.success {
            return Err(KeyringError::Unavailable(format!(
                "gpg --list-keys failed: {}",
                run.stderr
            )));
        }

        let keys = parse_key_listing(&String::from_utf8_lossy(&run.stdout));
        debug!(count = keys.len(), "listed gpg keys");
        Ok(keys)
    }

    fn generate_key(&self, params: &KeyParams) -> Result<Fingerprint, KeyringError> {
        debug!(
            key_type = %params.key_type,
            length = params.key_length,
            usage = %params.usage.letters(),
            "generating gpg key"
        );

        let mut batch = key_params_batch(params);
        let run = self.run(
            ["--pinentry-mode", "loopback", "--status-fd", "1", "--gen-key"],
            batch.as_bytes(),
        );
        zeroize::Zeroize::zeroize(&mut batch);
        let run = run.map_err(KeyringError::WriteFailed)?;

        if !run.success {
            return Err(KeyringError::GenerationFailed(format!(
                "gpg --gen-key failed: {}",
                run.stderr
            )));
        }

        let fingerprint = parse_key_created(&String::from_utf8_lossy(&run.stdout))
            .ok_or_else(|| {
                KeyringError::GenerationFailed("gpg did not report KEY_CREATED".to_string())
            })?;

        debug!(fingerprint = %fingerprint, "generated gpg key");
        Ok(fingerprint)
    }
}

impl Cipher for Gpg {
    type Options = GpgOptions;

    fn name(&self) -> &'static str {
        "gpg"
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &str,
        options: &GpgOptions,
    ) -> Result<Vec<u8>, EncryptError> {
        trace!(plaintext_len = plaintext.len(), "encrypting with GPG");

        let mut args = vec!["--encrypt", "--recipient", recipient];
        if options.always_trust {
            args.extend(["--trust-model", "always"]);
        }
        if options.armor {
            args.push("--armor");
        }

        let run = self
            .run(&args, plaintext)
            .map_err(|e| EncryptError::Failed(format!("failed to run gpg: {}", e)))?;

        if !run.success {
            if run.stderr.contains("No public key") || run.stderr.contains("skipped") {
                return Err(EncryptError::UnknownRecipient(recipient.to_string()));
            }
            return Err(EncryptError::Failed(format!(
                "gpg encrypt failed: {}",
                run.stderr
            )));
        }

        trace!(ciphertext_len = run.stdout.len(), "encrypted with GPG");
        Ok(run.stdout)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: &Passphrase,
        _options: &GpgOptions,
    ) -> Result<Vec<u8>, DecryptError> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting with GPG");

        // stdin carries the passphrase, so the ciphertext goes through a file
        let mut staged = tempfile::NamedTempFile::new()
            .map_err(|e| DecryptError::Failed(format!("failed to stage ciphertext: {}", e)))?;
        staged
            .write_all(ciphertext)
            .and_then(|_| staged.flush())
            .map_err(|e| DecryptError::Failed(format!("failed to stage ciphertext: {}", e)))?;

        let mut input = passphrase.expose().as_bytes().to_vec();
        input.push(b'\n');

        let args = [
            OsStr::new("--pinentry-mode"),
            OsStr::new("loopback"),
            OsStr::new("--passphrase-fd"),
            OsStr::new("0"),
            OsStr::new("--status-fd"),
            OsStr::new("2"),
            OsStr::new("--decrypt"),
            staged.path().as_os_str(),
        ];
        let run = self.run(args, &input);
        zeroize::Zeroize::zeroize(&mut input);
        let run = run.map_err(|e| DecryptError::Failed(format!("failed to run gpg: {}", e)))?;

        if !run.success {
            return Err(classify_decrypt_failure(&run.stderr));
        }

        trace!(plaintext_len = run.stdout.len(), "decrypted with GPG");
        Ok(run.stdout)
    }
}

/// Batch parameter block for `gpg --gen-key`.
///
/// An empty passphrase leaves the key unprotected.
fn key_params_batch(params: &KeyParams) -> String {
    let protection = if params.passphrase.is_empty() {
        "%no-protection".to_string()
    } else {
        format!("Passphrase: {}", params.passphrase.expose())
    };
    format!(
        "Key-Type: {}\nKey-Length: {}\nKey-Usage: {}\nName-Real: {}\nExpire-Date: 0\n{}\n%commit\n",
        params.key_type,
        params.key_length,
        params.usage.gpg_list(),
        params.name_real,
        protection,
    )
}

/// Parse `--with-colons` key listing output.
///
/// Each `pub` record starts a key; the first `fpr` after it is the primary
/// key's fingerprint (later ones belong to subkeys) and every `uid` record
/// adds a user id.
fn parse_key_listing(listing: &str) -> Vec<KeyInfo> {
    let mut keys = Vec::new();
    let mut current: Option<KeyInfo> = None;
    let mut in_primary = false;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("pub") => {
                keys.extend(current.take().filter(|k| !k.fingerprint.is_empty()));
                current = Some(KeyInfo::new(String::new(), Vec::new()));
                in_primary = true;
            }
            Some("sub") | Some("ssb") => in_primary = false,
            Some("fpr") if in_primary => {
                if let (Some(key), Some(fpr)) = (current.as_mut(), fields.get(9)) {
                    if key.fingerprint.is_empty() {
                        key.fingerprint = fpr.to_string();
                    }
                }
            }
            Some("uid") => {
                if let (Some(key), Some(uid)) = (current.as_mut(), fields.get(9)) {
                    key.uids.push(unescape_colons(uid));
                }
            }
            _ => {}
        }
    }
    keys.extend(current.filter(|k| !k.fingerprint.is_empty()));
    keys
}

/// Undo gpg's `\xNN` escaping in colon-listing fields.
fn unescape_colons(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = bytes[i] == b'\\'
            && bytes.get(i + 1) == Some(&b'x')
            && i + 3 < bytes.len()
            && bytes[i + 2].is_ascii_hexdigit()
            && bytes[i + 3].is_ascii_hexdigit();
        if escaped {
            if let Ok(b) = u8::from_str_radix(&field[i + 2..i + 4], 16) {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Fingerprint from a `[GNUPG:] KEY_CREATED <type> <fpr>` status line.
fn parse_key_created(status: &str) -> Option<Fingerprint> {
    status.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("[GNUPG:]") || parts.next() != Some("KEY_CREATED") {
            return None;
        }
        parts.nth(1).map(str::to_string)
    })
}

/// Map a failed `--decrypt` run to an error from its `--status-fd 2` lines.
///
/// gpg reports a wrong loopback passphrase as "No secret key" on stderr, so
/// the status keywords decide: a key that asked for a passphrase and then
/// turned out unusable means the passphrase was wrong.
fn classify_decrypt_failure(stderr: &str) -> DecryptError {
    let status: Vec<&str> = stderr
        .lines()
        .filter_map(|line| line.trim().strip_prefix("[GNUPG:] "))
        .collect();
    let has = |keyword: &str| {
        status
            .iter()
            .any(|line| line.split_whitespace().next() == Some(keyword))
    };

    let wrong_passphrase = has("BAD_PASSPHRASE")
        || status
            .iter()
            .any(|line| line.starts_with("ERROR pkdecrypt_failed 11"))
        || (has("NEED_PASSPHRASE") && has("NO_SECKEY"));

    if wrong_passphrase || stderr.contains("Bad passphrase") {
        DecryptError::BadPassphrase
    } else if has("NO_SECKEY") || stderr.contains("No secret key") {
        DecryptError::NoSecretKey
    } else {
        let message: Vec<&str> = stderr
            .lines()
            .filter(|line| !line.trim().starts_with("[GNUPG:]"))
            .collect();
        DecryptError::Failed(format!("gpg decrypt failed: {}", message.join("\n")))
    }
}
