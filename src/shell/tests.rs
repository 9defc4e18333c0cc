use super::*;
use crate::test_utils::{ScriptedConsole, UNREACHABLE_API, fake_tracker, reporter_config};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

#[derive(Debug)]
struct ValueError;

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("bad input")
    }
}

fn fixed_lead_in() -> &'static str {
    "LEAD-IN"
}

fn reporter(api: &str, answers: &[&str]) -> (Reporter<ScriptedConsole>, TempDir) {
    let dir = tempdir().unwrap();
    let reporter = Reporter::new(reporter_config(api), InstallPaths::new(dir.path()))
        .with_console(ScriptedConsole::new(answers))
        .with_lead_in(fixed_lead_in);
    (reporter, dir)
}

// Tests that swap the process-wide panic hook run one at a time.
static HOOK_LOCK: Mutex<()> = Mutex::new(());

fn hook_lock() -> MutexGuard<'static, ()> {
    HOOK_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn saved_reports(dir: &Path) -> Vec<serde_json::Value> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().unwrap().to_str().unwrap().starts_with("error_report_"))
        .map(|p| serde_json::from_str(&std::fs::read_to_string(p).unwrap()).unwrap())
        .collect()
}

#[test]
fn panic_is_shown_reported_and_saved_when_offline() {
    let _hook = hook_lock();
    let (mut reporter, dir) = reporter(UNREACHABLE_API, &["it crashed on save"]);

    let outcome = reporter
        .supervise(|| -> std::result::Result<(), ValueError> { panic!("boom") })
        .unwrap();

    assert!(matches!(outcome, Some(DeliveryOutcome::Failed { .. })));
    let console = reporter.console();
    assert!(console.printed("Error in Demo App"));
    assert!(console.printed("Traceback:"));
    assert_eq!(console.prompts, vec!["Add any additional details (optional)"]);

    let saved = saved_reports(dir.path());
    assert_eq!(saved.len(), 1);
    let title = saved[0]["title"].as_str().unwrap();
    assert!(title.starts_with("Panic: boom at "), "{title}");
    assert!(title.contains("tests.rs, line "), "{title}");
    let body = saved[0]["body"].as_str().unwrap();
    assert!(body.starts_with("LEAD-IN\n"));
    assert!(body.contains("User Notes:\nit crashed on save\n"));
    assert!(body.contains("panicked"));
}

#[test]
fn returned_error_is_titled_at_the_supervising_call() {
    let _hook = hook_lock();
    let (mut reporter, dir) = reporter(UNREACHABLE_API, &[""]);

    let line = line!() + 1;
    let outcome = reporter.supervise(|| Err(ValueError)).unwrap();

    assert!(outcome.is_some());
    let saved = saved_reports(dir.path());
    let title = saved[0]["title"].as_str().unwrap();
    assert!(title.starts_with("ValueError: bad input at "), "{title}");
    assert!(title.ends_with(&format!("tests.rs, line {line}")), "{title}");
}

#[test]
fn clean_run_reports_nothing() {
    let _hook = hook_lock();
    let (mut reporter, dir) = reporter(UNREACHABLE_API, &[]);

    let outcome = reporter
        .supervise(|| -> std::result::Result<(), ValueError> { Ok(()) })
        .unwrap();

    assert!(outcome.is_none());
    assert!(reporter.console().prompts.is_empty());
    assert!(saved_reports(dir.path()).is_empty());
}

#[test]
fn delivered_incident_leaves_no_local_file() {
    let (api, requests) = fake_tracker("201 Created", "{}");
    let (mut reporter, dir) = reporter(&api, &["steps to reproduce"]);

    let outcome = reporter.report_error(&ValueError).unwrap();

    assert!(matches!(outcome, DeliveryOutcome::Delivered));
    assert!(saved_reports(dir.path()).is_empty());
    let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(request.contains("ValueError: bad input at "));
    assert!(request.contains("steps to reproduce"));
}

#[test]
fn unanswered_notes_prompt_still_reports() {
    let (mut reporter, dir) = reporter(UNREACHABLE_API, &[]);

    let outcome = reporter.report_error(&ValueError).unwrap();

    assert!(matches!(outcome, DeliveryOutcome::Failed { .. }));
    assert_eq!(saved_reports(dir.path()).len(), 1);
}

#[test]
fn disabled_standalone_mode_never_prompts() {
    let dir = tempdir().unwrap();
    let mut config = reporter_config(UNREACHABLE_API);
    config.enable_standalone = false;
    let mut reporter = Reporter::new(config, InstallPaths::new(dir.path()))
        .with_console(ScriptedConsole::new(&["should not be read"]));

    let outcome = reporter.standalone().unwrap();

    assert!(outcome.is_none());
    assert!(reporter.console().prompts.is_empty());
    assert!(reporter.console().printed("Standalone mode is disabled"));
    assert!(saved_reports(dir.path()).is_empty());
}

#[test]
fn standalone_files_the_typed_title_and_description() {
    let (api, requests) = fake_tracker("201 Created", "{}");
    let (mut reporter, _dir) = reporter(&api, &["Export hangs", "Clicking export never finishes"]);

    let outcome = reporter.standalone().unwrap();

    assert!(matches!(outcome, Some(DeliveryOutcome::Delivered)));
    assert_eq!(reporter.console().prompts, vec!["Issue Title", "Issue Description"]);
    assert!(reporter.console().printed("Welcome to Demo App Bug Reporter"));
    let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(request.contains(
        r#"{"title":"Export hangs","body":"Clicking export never finishes"}"#
    ));
}

#[test]
fn run_maps_outcomes_to_exit_codes() {
    let _hook = hook_lock();
    let (mut reporter, _dir) = reporter(UNREACHABLE_API, &[""]);
    let code = reporter.run(|| Err(ValueError));
    assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::SUCCESS));

    let mut broken = Reporter::new(
        reporter_config(UNREACHABLE_API),
        InstallPaths::new("/nonexistent/crashnote-test-dir"),
    )
    .with_console(ScriptedConsole::new(&[""]));
    let code = broken.run(|| Err(ValueError));
    assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::FAILURE));
    assert!(broken.console().printed("Failed to save error report"));
}

#[test]
fn worker_thread_panic_reaches_the_previous_hook() {
    let _hook = hook_lock();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let original = panic::take_hook();
    panic::set_hook(Box::new(move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
    }));
    let (mut reporter, dir) = reporter(UNREACHABLE_API, &[]);

    let outcome = reporter
        .supervise(|| -> std::result::Result<(), ValueError> {
            let worker: std::thread::JoinHandle<()> =
                std::thread::spawn(|| panic!("worker failed"));
            assert!(worker.join().is_err());
            Ok(())
        })
        .unwrap();

    // The restored hook is still the counting one.
    let later: std::thread::JoinHandle<()> = std::thread::spawn(|| panic!("after supervise"));
    assert!(later.join().is_err());
    panic::set_hook(original);

    assert!(outcome.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(saved_reports(dir.path()).is_empty());
}

#[test]
fn supervising_thread_panic_is_not_forwarded() {
    let _hook = hook_lock();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let original = panic::take_hook();
    panic::set_hook(Box::new(move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
    }));
    let (mut reporter, dir) = reporter(UNREACHABLE_API, &[""]);

    let outcome = reporter
        .supervise(|| -> std::result::Result<(), ValueError> { panic!("boom") })
        .unwrap();
    panic::set_hook(original);

    assert!(outcome.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(saved_reports(dir.path()).len(), 1);
}
