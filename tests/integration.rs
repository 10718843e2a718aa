use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use sysdupd::config::{AppPaths, ConfigStore};
use sysdupd::notify::Notifier;
use sysdupd::orchestrator::{ServiceOutcome, run_service};
use sysdupd::runner::CommandOutput;
use sysdupd::test_utils::ScriptedRunner;
use tempfile::TempDir;

#[derive(Default)]
struct Inbox {
    messages: Mutex<Vec<String>>,
}

impl Notifier for Inbox {
    fn notify(&self, _title: &str, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

fn paths(dir: &TempDir) -> AppPaths {
    AppPaths::new(&dir.path().join("config"), &dir.path().join("data"))
}

/// Declares a fake package manager in profiles.toml so the resolver picks it
/// up regardless of what the host has installed.
fn install_fake_manager(dir: &TempDir, paths: &AppPaths) {
    let binary = dir.path().join("fakepm");
    fs::write(&binary, "").unwrap();
    fs::create_dir_all(&paths.config_dir).unwrap();
    fs::write(
        &paths.profiles_file,
        format!(
            "[[manager]]\nname = \"fakepm\"\nbinary = \"{}\"\nrefresh = \"fakepm sync\"\nlist = \"fakepm outdated\"\nupgrade = \"fakepm upgrade\"\n",
            binary.display()
        ),
    )
    .unwrap();
}

#[test]
fn service_run_with_corrupt_config_notifies_with_defaults() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    install_fake_manager(&dir, &paths);
    fs::write(&paths.config_file, "{ this is not json").unwrap();

    let runner = Arc::new(
        ScriptedRunner::new()
            .respond("fakepm sync", CommandOutput::ok(""))
            .respond(
                "fakepm outdated",
                CommandOutput::ok("foo 1.0 -> 1.1\nbar headers\nbaz 2 -> 3\n"),
            ),
    );
    let inbox = Arc::new(Inbox::default());
    let outcome = run_service(&paths, runner.clone(), inbox.clone());

    assert_eq!(
        outcome,
        ServiceOutcome::Pending {
            count: 2,
            notified: true
        }
    );
    assert_eq!(*inbox.messages.lock().unwrap(), ["2 updates ready!"]);
    assert!(runner.calls_to("fakepm").iter().all(|c| c != "fakepm upgrade"));
    // service mode never rewrites the config
    assert_eq!(
        fs::read_to_string(&paths.config_file).unwrap(),
        "{ this is not json"
    );
}

#[test]
fn service_run_auto_applies_from_saved_config() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    install_fake_manager(&dir, &paths);
    let store = ConfigStore::new(&paths.config_file);
    let mut config = store.load().unwrap();
    store
        .update(&mut config, |c| {
            c.auto_update = true;
            c.check_flatpaks = false;
        })
        .unwrap();

    let runner = Arc::new(
        ScriptedRunner::new()
            .respond("fakepm outdated", CommandOutput::ok("foo 1 -> 2\n"))
            .respond("fakepm upgrade", CommandOutput::ok("upgraded foo")),
    );
    let inbox = Arc::new(Inbox::default());
    let outcome = run_service(&paths, runner.clone(), inbox.clone());

    assert!(matches!(
        outcome,
        ServiceOutcome::Applied(ref r) if r.success && r.message == "upgraded foo"
    ));
    assert_eq!(*inbox.messages.lock().unwrap(), ["Background updates applied!"]);
    let history = fs::read_to_string(&paths.history_file).unwrap();
    assert!(history.trim_end().ends_with("Background update run: Success"));
}

#[test]
fn service_run_on_unsupported_host_is_a_no_op() {
    if Path::new("/usr/bin/pacman").exists() {
        eprintln!("pacman is installed on this host, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let runner = Arc::new(ScriptedRunner::new());
    let outcome = run_service(&paths, runner.clone(), Arc::new(Inbox::default()));

    assert_eq!(outcome, ServiceOutcome::NoUpdates);
    assert!(runner.calls_to("pkexec").is_empty());
}

#[test]
fn binary_reports_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_sysdupd"))
        .arg("--help")
        .output()
        .expect("failed to execute process");

    assert!(output.status.success(), "Help failed: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--service"), "Expected --service in help output");
}
