//! Integration test for `globimport watch`.
//!
//! Starts a session, adds a file matching a module's glob import and expects
//! an `update` payload naming that module on stdout.

use serial_test::serial;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(20);

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Forward every line of `reader` to a channel.
fn lines(reader: impl Read + Send + 'static) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Wait for a line containing `needle`.
fn wait_for(rx: &mpsc::Receiver<String>, needle: &str) -> Option<String> {
    let deadline = Instant::now() + TIMEOUT;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(line) if line.contains(needle) => return Some(line),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    None
}

struct KillOnDrop(Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

#[test]
#[serial]
fn test_watch_reports_added_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "package.json", r#"{"name": "test"}"#);
    write(dir.path(), "src/mods/a.ts", "export default 'a';\n");
    write(
        dir.path(),
        "src/main.ts",
        "export const mods = import.meta.importGlob('./mods/*.ts');\n",
    );

    let mut child = Command::new(env!("CARGO_BIN_EXE_globimport"))
        .env_remove("RUST_LOG")
        .args(["watch", "--root"])
        .arg(dir.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start watch session");
    let stdout = lines(child.stdout.take().unwrap());
    let stderr = lines(child.stderr.take().unwrap());
    let _child = KillOnDrop(child);

    assert!(
        wait_for(&stderr, "watch session ready").is_some(),
        "session never became ready"
    );

    write(dir.path(), "src/mods/c.ts", "export default 'c';\n");

    let line = wait_for(&stdout, "\"type\":\"update\"").expect("no update payload");
    let payload: serde_json::Value = serde_json::from_str(&line).unwrap();
    let path = payload["updates"][0]["path"].as_str().unwrap();
    assert!(path.ends_with("/src/main.ts"), "{path}");
    assert_eq!(payload["updates"][0]["type"], "js-update");
    assert_eq!(payload["updates"][0]["acceptedPath"], path);
}

#[test]
#[serial]
fn test_watch_ignores_unrelated_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "package.json", r#"{"name": "test"}"#);
    write(dir.path(), "src/mods/a.ts", "export default 'a';\n");
    write(
        dir.path(),
        "src/main.ts",
        "export const mods = import.meta.importGlob('./mods/*.ts');\n",
    );

    let mut child = Command::new(env!("CARGO_BIN_EXE_globimport"))
        .env_remove("RUST_LOG")
        .args(["watch", "--root"])
        .arg(dir.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start watch session");
    let stdout = lines(child.stdout.take().unwrap());
    let stderr = lines(child.stderr.take().unwrap());
    let _child = KillOnDrop(child);

    assert!(wait_for(&stderr, "watch session ready").is_some());

    write(dir.path(), "src/mods/notes.md", "# notes\n");
    thread::sleep(Duration::from_millis(500));
    assert!(stdout.try_recv().is_err());
}

#[test]
#[serial]
fn test_watch_root_patterns_see_new_directories() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "package.json", r#"{"name": "test"}"#);
    write(
        dir.path(),
        "src/main.ts",
        "export const docs = import.meta.importGlob('**/*.md', { as: 'raw' });\n",
    );

    let mut child = Command::new(env!("CARGO_BIN_EXE_globimport"))
        .env_remove("RUST_LOG")
        .args(["watch", "--root"])
        .arg(dir.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start watch session");
    let stdout = lines(child.stdout.take().unwrap());
    let stderr = lines(child.stderr.take().unwrap());
    let _child = KillOnDrop(child);

    assert!(wait_for(&stderr, "watch session ready").is_some());

    fs::create_dir_all(dir.path().join("docs/guides")).unwrap();
    thread::sleep(Duration::from_millis(500));
    write(dir.path(), "docs/guides/intro.md", "# intro\n");

    let line = wait_for(&stdout, "\"type\":\"update\"").expect("no update payload");
    let payload: serde_json::Value = serde_json::from_str(&line).unwrap();
    let path = payload["updates"][0]["path"].as_str().unwrap();
    assert!(path.ends_with("/src/main.ts"), "{path}");
}
