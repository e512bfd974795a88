//! Logging and verbosity tests.
//!
//! The verbose flag and KEYWARD_LOG control what reaches stderr; the
//! passphrase never does.

mod support;
use support::*;

#[test]
fn test_default_no_log_output() {
    let t = Test::new();

    let output = t.fingerprint();
    assert_success(&output);

    let err = stderr(&output);
    assert!(
        !err.contains("DEBUG") && !err.contains("TRACE"),
        "Default mode should not show debug/trace output"
    );
}

#[test]
fn test_verbose_flag_shows_resolution() {
    let t = Test::new();

    let output = t.cmd().args(["--verbose", "fingerprint"]).output().unwrap();
    assert_success(&output);

    let err = stderr(&output);
    assert!(err.contains("DEBUG"), "verbose should show debug logs: {}", err);
    assert!(err.contains("resolving key"));
}

#[test]
fn test_verbose_from_settings_file() {
    let t = Test::new();
    let settings = std::fs::read_to_string(&t.config).unwrap();
    std::fs::write(&t.config, format!("verbose = true\n{}", settings)).unwrap();

    let output = t.fingerprint();
    assert_success(&output);
    assert!(stderr(&output).contains("listed age keys"));
}

#[test]
fn test_keyward_log_env_var() {
    let t = Test::new();

    let output = t
        .cmd()
        .env("KEYWARD_LOG", "keyward=trace")
        .args(["encrypt", "hello"])
        .output()
        .unwrap();
    assert_success(&output);
    assert!(stderr(&output).contains("TRACE"));
}

#[test]
fn test_passphrase_never_logged() {
    let t = Test::new();

    let output = t
        .cmd()
        .env("KEYWARD_LOG", "keyward=trace")
        .args(["--verbose", "encrypt", "hello"])
        .output()
        .unwrap();
    assert_success(&output);

    let envelope = stdout(&output);
    let output = t
        .cmd()
        .env("KEYWARD_LOG", "keyward=trace")
        .arg("decrypt")
        .write_stdin(envelope)
        .output()
        .unwrap();
    assert_success(&output);
    assert!(!stderr(&output).contains(PASSPHRASE));
}
