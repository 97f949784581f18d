use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// A descriptor with one zip file next to it.
fn create_descriptor(file_name: &str) -> TempDir {
    let dir = tempdir().expect("temp dir");
    write(dir.path().join(file_name), b"zip").expect("write release file");
    let yaml = format!(
        "project:\n  short_name: proj-1\nadministrator:\n  user: alice\npackage:\n  name: pkg-1\nrelease:\n  name: rel-1\nfiles:\n  - path: \"{file_name}\"\n"
    );
    write(dir.path().join("release.yaml"), yaml).expect("write descriptor");
    dir
}

fn descriptor(dir: &Path) -> std::path::PathBuf {
    dir.join("release.yaml")
}

#[test]
fn check_prints_plan_for_valid_descriptor() {
    let dir = create_descriptor("tool-1.0.zip");
    let mut cmd = Command::cargo_bin("frs-publish").expect("Binary exists");

    cmd.arg("check")
        .arg("--config")
        .arg(descriptor(dir.path()))
        .env("FRS_PASSWORD", "s3cret");

    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("Release rel-1 of package pkg-1 in project proj-1")
                .and(predicate::str::contains("/home/frs/project/p/pr/proj-1/pkg-1/rel-1"))
                .and(predicate::str::contains("tool-1.0.zip type=3000"))
                .and(predicate::str::contains("s3cret").not()),
        );
}

#[test]
fn check_fails_without_password() {
    let dir = create_descriptor("tool-1.0.zip");
    let mut cmd = Command::cargo_bin("frs-publish").expect("Binary exists");

    cmd.arg("check")
        .arg("--config")
        .arg(descriptor(dir.path()))
        .env_remove("FRS_PASSWORD")
        .current_dir(dir.path());

    cmd.assert().failure();
}

#[test]
fn check_fails_for_forbidden_file_name() {
    let dir = create_descriptor("tool (copy).zip");
    let mut cmd = Command::cargo_bin("frs-publish").expect("Binary exists");

    cmd.arg("check")
        .arg("--config")
        .arg(descriptor(dir.path()))
        .env("FRS_PASSWORD", "s3cret");

    cmd.assert().failure();
}

#[test]
fn missing_descriptor_fails() {
    let mut cmd = Command::cargo_bin("frs-publish").expect("Binary exists");
    cmd.arg("check").arg("--config").arg("does-not-exist.yaml");
    cmd.assert().failure();
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_and_exit_events() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use frs_publish::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Check {
            config: std::path::PathBuf::from("dummy.yaml"),
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "dummy descriptor does not exist");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
    assert!(
        event_msgs.iter().any(|msg| msg.contains("exit")),
        "Expected an 'exit' event, got: {:?}",
        event_msgs
    );
}
