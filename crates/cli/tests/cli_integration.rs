//! CLI integration tests for the non-server paths of the `actlog` binary.
//!
//! Uses `assert_cmd` to spawn the binary and verify exit codes, stdout
//! content, and stderr content.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

fn actlog() -> Command {
    let mut cmd = cargo_bin_cmd!("actlog");
    cmd.env_remove("ACTLOG_TOKENS");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_exits_0_with_description() {
    actlog()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Per-user activity record service"));
}

#[test]
fn transitions_text_lists_every_status() {
    actlog()
        .arg("transitions")
        .assert()
        .success()
        .stdout(predicate::str::contains("PENDING"))
        .stdout(predicate::str::contains("-> IN_PROGRESS"))
        .stdout(predicate::str::contains("Completed"))
        .stdout(predicate::str::contains("(terminal)"));
}

#[test]
fn transitions_json_is_the_table() {
    let output = actlog()
        .args(["--output", "json", "transitions"])
        .output()
        .expect("failed to run actlog");

    assert!(output.status.success());
    let table: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON table");
    let rows = table.as_array().expect("array");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["status"], "PENDING");
    assert_eq!(rows[0]["allowed_next"], serde_json::json!(["IN_PROGRESS"]));
    assert_eq!(rows[1]["label"], "In Progress");
    assert_eq!(rows[1]["allowed_next"], serde_json::json!(["DONE"]));
    assert_eq!(rows[2]["status"], "DONE");
    assert_eq!(rows[2]["allowed_next"], serde_json::json!([]));
}

#[test]
fn serve_without_principals_exits_1() {
    actlog()
        .args(["serve", "--port", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no principals configured"));
}

#[test]
fn serve_with_missing_config_file_exits_1() {
    actlog()
        .args(["serve", "--config", "/nonexistent/actlog.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error reading config file"));
}

#[test]
fn serve_rejects_malformed_token_env() {
    actlog()
        .args(["serve"])
        .env("ACTLOG_TOKENS", "alice")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ACTLOG_TOKENS"));
}

#[test]
fn mismatched_tls_flags_are_rejected() {
    actlog()
        .args(["serve", "--tls-cert", "cert.pem"])
        .env("ACTLOG_TOKENS", "alice=t")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tls-key"));
}

#[cfg(not(feature = "tls"))]
#[test]
fn tls_flags_without_tls_feature_exit_1() {
    actlog()
        .args(["serve", "--tls-cert", "cert.pem", "--tls-key", "key.pem"])
        .env("ACTLOG_TOKENS", "alice=t")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("`tls` feature"));
}
