//! End-to-end `yaysh exec` and `yaysh setup` tests.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

fn yaysh(config_dir: &std::path::Path) -> Command {
    let mut cmd = cargo_bin_cmd!("yaysh");
    cmd.env("YAYSH_CONFIG_DIR", config_dir);
    cmd
}

#[test]
fn exec_prints_delegated_output() {
    let tmp = tempfile::tempdir().unwrap();
    yaysh(tmp.path())
        .args(["exec", "echo hi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hi"));
}

#[test]
fn exec_silent_command_prints_sentinel() {
    let tmp = tempfile::tempdir().unwrap();
    yaysh(tmp.path())
        .args(["exec", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no output)"));
}

#[test]
fn exec_failed_cd_exits_nonzero() {
    let tmp = tempfile::tempdir().unwrap();
    yaysh(tmp.path())
        .args(["exec", "cd /nonexistent-xyz"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Error changing directory"));
}

#[test]
fn exec_timeout_is_reported_distinctly() {
    let tmp = tempfile::tempdir().unwrap();
    yaysh(tmp.path())
        .args(["exec", "--timeout", "1", "sleep 10"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("timed out"));
}

#[test]
fn exec_json_format_carries_result_fields() {
    let tmp = tempfile::tempdir().unwrap();
    yaysh(tmp.path())
        .args(["exec", "--format", "json", "echo hi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"exit_succeeded\": true"))
        .stdout(predicate::str::contains("\"output\": \"hi\""));
}

#[test]
fn exec_strict_elevation_fails_without_helper() {
    let tmp = tempfile::tempdir().unwrap();
    // The default helper paths only exist on rooted Android-style layouts;
    // on a normal test host strict elevation must fail.
    yaysh(tmp.path())
        .args(["--strict-elevation", "exec", "--elevate", "echo hi"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("elevation"));
}

#[test]
fn repl_survives_blank_input_lines() {
    let tmp = tempfile::tempdir().unwrap();
    yaysh(tmp.path())
        .arg("run")
        .write_stdin("\n   \necho hi\nexit\n")
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("hi"));
}

#[test]
fn yaysh_log_env_var_controls_logging() {
    let tmp = tempfile::tempdir().unwrap();
    yaysh(tmp.path())
        .env("YAYSH_LOG", "debug")
        .args(["exec", "echo hi"])
        .assert()
        .success()
        .stderr(predicate::str::contains("delegating to host shell"));
}

#[test]
fn setup_then_whoamiyay_round_trips_identity() {
    let tmp = tempfile::tempdir().unwrap();

    yaysh(tmp.path())
        .args(["setup", "--username", "yay", "--hostname", "droid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Setup complete"));

    assert!(tmp.path().join("dontdeletethis.file").exists());

    yaysh(tmp.path())
        .args(["exec", "whoamiyay"])
        .assert()
        .success()
        .stdout(predicate::str::contains("yay"));
}

#[test]
fn setup_with_password_persists_through_a_backend() {
    let tmp = tempfile::tempdir().unwrap();
    yaysh(tmp.path())
        .args([
            "setup",
            "--username",
            "yay",
            "--hostname",
            "droid",
            "--password",
            "hunter2",
        ])
        .assert()
        .success();

    // Highest-priority backend on unix is the secure file store.
    #[cfg(unix)]
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("secrets/yay_password")).unwrap(),
        "hunter2"
    );
}
