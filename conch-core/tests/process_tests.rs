#![cfg(unix)]

use std::time::Duration;

use conch_core::backend::{LaunchSpec, ProcessBackend};
use conch_core::console::Console;
use conch_core::job::{JobOutcome, LaunchError, StartError};
use conch_core::style::StyleTag;

fn sh(script: &str) -> LaunchSpec {
    LaunchSpec::new("/bin/sh").args(["-c", script])
}

fn backend() -> ProcessBackend {
    ProcessBackend::current().expect("tests run inside a tokio runtime")
}

/// Pumps until the active job retires.
async fn wait_for_outcome(console: &mut Console) -> JobOutcome {
    for _ in 0..500 {
        if let Some(outcome) = console.pump().into_iter().next() {
            return outcome;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job did not finish in time");
}

fn lines_tagged(console: &Console, tag: StyleTag) -> String {
    console
        .buffer()
        .runs()
        .iter()
        .filter(|run| run.style().tag == tag)
        .map(|run| run.text())
        .collect()
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_missing_program_is_rejected() {
    let spec = LaunchSpec::new("/definitely/not/here");
    assert_eq!(
        spec.validate(),
        Err(LaunchError::ProgramNotFound("/definitely/not/here".into()))
    );
}

#[test]
fn test_unknown_bare_name_is_rejected() {
    let spec = LaunchSpec::new("conch-no-such-program-xyz");
    assert!(matches!(spec.validate(), Err(LaunchError::ProgramNotFound(_))));
}

#[test]
fn test_bare_name_resolves_on_path() {
    let resolved = LaunchSpec::new("sh").validate().unwrap();
    assert!(resolved.is_absolute());
}

#[test]
fn test_non_executable_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("plain.txt");
    std::fs::write(&script, "echo hi").unwrap();
    let spec = LaunchSpec::new(script.to_string_lossy());
    assert_eq!(spec.validate(), Err(LaunchError::NotExecutable(script)));
}

#[test]
fn test_directory_as_program_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let spec = LaunchSpec::new(dir.path().to_string_lossy());
    assert!(matches!(spec.validate(), Err(LaunchError::NotExecutable(_))));
}

#[test]
fn test_missing_working_dir_is_rejected() {
    let spec = sh("true").current_dir("/no/such/dir");
    assert_eq!(
        spec.validate(),
        Err(LaunchError::NoSuchDirectory("/no/such/dir".into()))
    );
}

#[test]
fn test_display_joins_command_line() {
    assert_eq!(sh("echo hi").display(), "/bin/sh -c echo hi");
}

// ============================================================================
// Run Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_streams_output_and_exit_code() {
    let mut console = Console::default();
    let mut backend = backend();
    console
        .start(&mut backend, sh("echo hello; echo oops 1>&2; exit 3"))
        .unwrap();
    assert!(console.is_running());

    let outcome = wait_for_outcome(&mut console).await;
    match outcome {
        JobOutcome::Completed { exit_code, .. } => assert_eq!(exit_code, Some(3)),
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(lines_tagged(&console, StyleTag::Stdout), "hello\n");
    assert_eq!(lines_tagged(&console, StyleTag::Stderr), "oops\n");
    assert!(!console.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_output_precedes_completion() {
    let mut console = Console::default();
    let mut backend = backend();
    console
        .start(&mut backend, sh("for i in 1 2 3 4 5; do echo line$i; done"))
        .unwrap();

    wait_for_outcome(&mut console).await;
    assert_eq!(
        console.buffer().text(),
        "line1\nline2\nline3\nline4\nline5\n"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_partial_last_line_and_carriage_return() {
    let mut console = Console::default();
    let mut backend = backend();
    console
        .start(&mut backend, sh("printf 'dos\\r\\nno newline'"))
        .unwrap();

    wait_for_outcome(&mut console).await;
    assert_eq!(console.buffer().text(), "dos\nno newline\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_working_dir_and_environment() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = dir.path().canonicalize().unwrap();
    let mut console = Console::default();
    let mut backend = backend();
    let spec = sh("pwd; echo \"$CONCH_TEST_VAR\"")
        .current_dir(&canonical)
        .env("CONCH_TEST_VAR", "from-env");
    console.start(&mut backend, spec).unwrap();

    wait_for_outcome(&mut console).await;
    assert_eq!(
        console.buffer().text(),
        format!("{}\nfrom-env\n", canonical.display())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replaced_environment_drops_parent_vars() {
    let mut console = Console::default();
    let mut backend = backend();
    let spec = sh("echo \"[$HOME]\"").append_env(false);
    console.start(&mut backend, spec).unwrap();

    wait_for_outcome(&mut console).await;
    assert_eq!(console.buffer().text(), "[]\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejected_launch_creates_no_job() {
    let mut console = Console::default();
    let mut backend = backend();
    let result = console.start(&mut backend, LaunchSpec::new("/definitely/not/here"));
    assert!(matches!(result, Err(StartError::LaunchRejected(_))));
    assert!(!console.is_running());
    assert!(console.pump().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_start_while_running_is_rejected() {
    let mut console = Console::default();
    let mut backend = backend();
    console.start(&mut backend, sh("sleep 30")).unwrap();

    let second = console.start(&mut backend, sh("echo never"));
    assert_eq!(second, Err(StartError::AlreadyRunning));

    assert!(console.stop());
    assert_eq!(wait_for_outcome(&mut console).await, JobOutcome::Interrupted);
    assert!(!console.buffer().text().contains("never"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interrupt_kills_process_group() {
    let mut console = Console::default();
    let mut backend = backend();
    // The pipeline's children must die with the shell for stdout to close.
    console
        .start(&mut backend, sh("echo started; sleep 30 | cat"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(console.stop());
    assert!(console.is_running());
    let outcome = wait_for_outcome(&mut console).await;

    assert_eq!(outcome, JobOutcome::Interrupted);
    assert!(console.buffer().text().starts_with("started\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interrupt_after_shell_exit_kills_background_job() {
    let mut console = Console::default();
    let mut backend = backend();
    // The shell exits at once; the backgrounded sleep keeps stdout open.
    console
        .start(&mut backend, sh("sleep 20 & echo started"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(console.pump().is_empty());
    assert!(console.is_running());

    assert!(console.stop());
    let outcome = wait_for_outcome(&mut console).await;

    assert_eq!(outcome, JobOutcome::Interrupted);
    assert!(!console.is_running());
    assert!(console.buffer().text().starts_with("started\n"));
}
