//! End-to-end console engine tests against the real filesystem and shell.

use std::time::{Duration, Instant};

use ysh_common::{is_first_run, resolve_config_dir, Identity, SetupOutcome};
use ysh_console::{
    CommandDispatcher, CommandResult, FailureKind, PrivilegeProbe, ProcessRunner, RunnerConfig,
    Session,
};
use ysh_store::CredentialStore;

fn dispatcher() -> CommandDispatcher {
    CommandDispatcher::new(ProcessRunner::new(
        RunnerConfig::default(),
        PrivilegeProbe::with_paths(vec![]),
    ))
}

#[test]
fn cd_then_ls_reflects_the_new_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let sub = tmp.path().join("d");
    std::fs::create_dir(&sub).unwrap();
    std::fs::write(sub.join("inside.txt"), "").unwrap();
    std::fs::write(tmp.path().join("outside.txt"), "").unwrap();

    let mut session = Session::new(tmp.path(), Identity::new("u", "h"));
    let d = dispatcher();

    let cd = d.dispatch("cd d", &mut session, false);
    assert!(cd.exit_succeeded);

    let ls = d.dispatch("ls", &mut session, false);
    assert!(ls.exit_succeeded);
    assert!(ls.output.contains("inside.txt"));
    assert!(!ls.output.contains("outside.txt"));
    assert_eq!(session.working_dir(), sub.canonicalize().unwrap());
}

#[test]
fn failed_cd_keeps_prompt_and_directory_stable() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = Session::new(tmp.path(), Identity::new("u", "h"));
    let d = dispatcher();
    let prompt_before = session.prompt();

    let result = d.dispatch("cd /nonexistent-xyz", &mut session, false);
    assert!(!result.exit_succeeded);
    assert!(result.output.contains("Error changing directory"));
    assert_eq!(session.working_dir(), tmp.path());
    assert_eq!(session.prompt(), prompt_before);
}

#[test]
fn delegated_pipeline_runs_through_the_host_shell() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = Session::new(tmp.path(), Identity::new("u", "h"));
    let result = dispatcher().dispatch("printf 'a\\nb\\n' | wc -l", &mut session, false);
    assert!(result.exit_succeeded);
    assert_eq!(result.output.trim(), "2");
}

#[test]
fn timeout_result_arrives_near_the_deadline() {
    let runner = ProcessRunner::new(
        RunnerConfig {
            default_timeout: Duration::from_millis(300),
            ..RunnerConfig::default()
        },
        PrivilegeProbe::with_paths(vec![]),
    );
    let d = CommandDispatcher::new(runner);
    let tmp = tempfile::tempdir().unwrap();
    let mut session = Session::new(tmp.path(), Identity::new("u", "h"));

    let start = Instant::now();
    let result = d.dispatch("sleep 20", &mut session, false);
    assert_eq!(result.failure, Some(FailureKind::Timeout));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn elevation_degrades_when_no_helper_exists() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = Session::new(tmp.path(), Identity::new("u", "h"));
    let result = dispatcher().dispatch("echo hi", &mut session, true);
    assert_eq!(result, CommandResult::success("hi"));
}

#[test]
fn first_run_setup_persists_identity_and_credential() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = resolve_config_dir(Some(tmp.path())).unwrap();
    assert!(is_first_run(&dir));

    let identity = Identity::new("yay", "droid");
    identity.store(&dir).unwrap();
    let store = CredentialStore::with_default_chain(dir.path());
    assert!(store.save("yay_password", "hunter2"));
    ysh_common::mark_setup_complete(&dir, SetupOutcome::Completed).unwrap();

    assert!(!is_first_run(&dir));
    assert_eq!(Identity::load(&dir), identity);
    assert_eq!(store.load("yay_password").as_deref(), Some("hunter2"));

    let session = Session::new("/", Identity::load(&dir));
    assert_eq!(session.prompt(), "yay@droid $ ~/ ");
}
