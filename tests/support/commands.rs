//! Command helper methods for Test.

use super::{Test, PASSPHRASE};
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a keyward command bound to this test's settings.
    ///
    /// Returns a Command configured with:
    /// - KEYWARD_CONFIG pointing at the test settings file
    /// - KEYWARD_PASSPHRASE set to [`PASSPHRASE`]
    /// - NO_COLOR so output can be matched literally
    pub fn cmd(&self) -> Command {
        let mut cmd = self.cmd_without_passphrase();
        cmd.env("KEYWARD_PASSPHRASE", PASSPHRASE);
        cmd
    }

    /// Like [`Test::cmd`] but with no passphrase in the environment.
    pub fn cmd_without_passphrase(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("keyward").expect("failed to find keyward binary");
        cmd.env("KEYWARD_CONFIG", &self.config);
        cmd.env("NO_COLOR", "1");
        for var in [
            "KEYWARD_PASSPHRASE",
            "KEYWARD_NAME",
            "KEYWARD_KEYDIR",
            "KEYWARD_BACKEND",
            "KEYWARD_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `keyward encrypt TEXT`.
    pub fn encrypt(&self, text: &str) -> Output {
        self.cmd()
            .args(["encrypt", text])
            .output()
            .expect("failed to run keyward encrypt")
    }

    /// Shortcut for `keyward decrypt` with the envelope on stdin.
    pub fn decrypt(&self, envelope: &str) -> Output {
        self.cmd()
            .arg("decrypt")
            .write_stdin(envelope)
            .output()
            .expect("failed to run keyward decrypt")
    }

    /// Shortcut for `keyward decrypt` with a different passphrase.
    pub fn decrypt_as(&self, envelope: &str, passphrase: &str) -> Output {
        self.cmd()
            .env("KEYWARD_PASSPHRASE", passphrase)
            .arg("decrypt")
            .write_stdin(envelope)
            .output()
            .expect("failed to run keyward decrypt")
    }

    /// Shortcut for `keyward fingerprint`.
    pub fn fingerprint(&self) -> Output {
        self.cmd()
            .arg("fingerprint")
            .output()
            .expect("failed to run keyward fingerprint")
    }

    /// Shortcut for `keyward keys --json`.
    pub fn keys_json(&self) -> Output {
        self.cmd()
            .args(["keys", "--json"])
            .output()
            .expect("failed to run keyward keys --json")
    }
}
