//! Test assertion helpers.

use std::process::Output;

use keyward::error::{DecryptError, Error};

/// Assert that a command output was successful.
pub fn assert_success(output: &Output) {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("Command failed:\n{}", stderr);
    }
}

/// Assert that a command output failed.
pub fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "Expected command to fail but it succeeded"
    );
}

/// Get stdout as String.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Get stderr as String.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Assert stderr contains a string.
pub fn assert_stderr_contains(output: &Output, expected: &str) {
    let err = stderr(output);
    assert!(
        err.contains(expected),
        "stderr missing '{}', got: {}",
        expected,
        err
    );
}

/// Assert an envelope is base64 text wrapped at 76 columns.
pub fn assert_envelope(envelope: &str) {
    assert!(envelope.ends_with('\n'), "envelope missing trailing newline");
    for line in envelope.lines() {
        assert!(line.len() <= 76, "line longer than 76 columns: {}", line);
        assert!(
            line.bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='),
            "non-base64 character in {}",
            line
        );
    }
}

/// Assert a library error is a decryption failure.
pub fn assert_decrypt_error(err: &Error) {
    assert!(
        matches!(
            err,
            Error::Decrypt(DecryptError::BadPassphrase | DecryptError::NoSecretKey)
        ),
        "expected decrypt error, got: {:?}",
        err
    );
}
