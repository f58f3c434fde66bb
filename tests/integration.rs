use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_defsync")))
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Copy the pristine bindings fixture into a tempdir so runs can write.
fn staged_bindings(dir: &TempDir) -> PathBuf {
    let dest = dir.path().join("core_bindings.cc");
    std::fs::copy(fixture_path("core_bindings.cc"), &dest).unwrap();
    dest
}

/// Common sync arguments: reuse fixture records, format with plain `cat`.
fn sync_args(bindings: &Path) -> Vec<String> {
    vec![
        "sync".into(),
        "--skip-generate".into(),
        "--bindings".into(),
        bindings.to_str().unwrap().into(),
        "--class".into(),
        "Core".into(),
        "--xml-dir".into(),
        fixture_path("xml"),
        "--formatter".into(),
        "cat".into(),
    ]
}

// -- sync: write path --

#[test]
fn sync_inserts_and_updates_docstrings() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);

    cmd().args(sync_args(&bindings)).assert().success();

    let patched = std::fs::read_to_string(&bindings).unwrap();
    // inserted from the _a-marker fallback arity
    assert!(patched.contains(r#""ms"_a, "Sets exposure time in ms." RGIL"#));
    // inserted from the overload_cast type list
    assert!(patched.contains(r#""value"_a, "Sets the property value." RGIL"#));
    // brief + first detailed paragraph, newline-escaped
    assert!(patched.contains(r#"settings.\n\nThe acquired frame stays"#));
    // stale literal replaced in place
    assert!(!patched.contains("Stale text."));
    assert!(patched.contains("Returns the module and device interface versions."));
    // index.xml is never read, and later duplicate records never win
    assert!(!patched.contains("WRONG"));
    assert!(!patched.contains("DUPLICATE"));
    // sites without a resolvable symbol stay untouched
    assert!(patched.contains(r#"[](Core &c) { while (c.busy("(")) {} } RGIL"#));
}

#[test]
fn second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);

    cmd().args(sync_args(&bindings)).assert().success();
    let first = std::fs::read_to_string(&bindings).unwrap();

    cmd().args(sync_args(&bindings)).assert().success();
    let second = std::fs::read_to_string(&bindings).unwrap();
    assert_eq!(first, second, "second run must produce no diff");
}

// -- sync: check mode --

#[test]
fn check_mode_signals_pending_changes_without_writing() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);
    let pristine = std::fs::read_to_string(&bindings).unwrap();

    let mut args = sync_args(&bindings);
    args.push("--check".into());
    cmd().args(&args).assert().code(1);

    assert_eq!(std::fs::read_to_string(&bindings).unwrap(), pristine);
}

#[test]
fn check_mode_is_clean_after_sync() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);

    cmd().args(sync_args(&bindings)).assert().success();

    let mut args = sync_args(&bindings);
    args.push("--check".into());
    cmd().args(&args).assert().success();
}

#[test]
fn json_report_lists_methods() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);

    let mut args = sync_args(&bindings);
    args.push("--check".into());
    args.push("--json".into());
    cmd()
        .args(&args)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("setProperty"))
        .stdout(predicate::str::contains("getVersionInfo"))
        .stdout(predicate::str::contains("busyLoop"));
}

// -- sync: external collaborators --

#[test]
fn generator_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);
    let pristine = std::fs::read_to_string(&bindings).unwrap();

    let args: Vec<String> = sync_args(&bindings)
        .into_iter()
        .filter(|a| a != "--skip-generate")
        .chain(["--doc-generator".into(), "false".into()])
        .collect();
    cmd().args(&args).assert().code(2);

    assert_eq!(std::fs::read_to_string(&bindings).unwrap(), pristine);
}

#[test]
fn generator_without_records_is_fatal() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);
    let empty = TempDir::new().unwrap();

    let args: Vec<String> = sync_args(&bindings)
        .into_iter()
        .filter(|a| a != "--skip-generate")
        .chain(["--doc-generator".into(), "true".into()])
        .collect();
    let args: Vec<String> = args
        .into_iter()
        .map(|a| {
            if a == fixture_path("xml") {
                empty.path().to_str().unwrap().to_string()
            } else {
                a
            }
        })
        .collect();
    cmd()
        .args(&args)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no XML records"));
}

#[test]
fn empty_index_is_a_clean_noop() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);
    let pristine = std::fs::read_to_string(&bindings).unwrap();
    let empty = TempDir::new().unwrap();

    let args: Vec<String> = sync_args(&bindings)
        .into_iter()
        .map(|a| {
            if a == fixture_path("xml") {
                empty.path().to_str().unwrap().to_string()
            } else {
                a
            }
        })
        .collect();
    cmd().args(&args).assert().success();
    assert_eq!(std::fs::read_to_string(&bindings).unwrap(), pristine);
}

#[test]
fn formatter_failure_is_fatal_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);
    let pristine = std::fs::read_to_string(&bindings).unwrap();

    let args: Vec<String> = sync_args(&bindings)
        .into_iter()
        .map(|a| if a == "cat" { "false".to_string() } else { a })
        .collect();
    cmd().args(&args).assert().code(2);

    assert_eq!(std::fs::read_to_string(&bindings).unwrap(), pristine);
}

#[test]
fn formatting_only_churn_discards_changes() {
    let dir = TempDir::new().unwrap();
    let bindings = staged_bindings(&dir);
    let pristine = std::fs::read_to_string(&bindings).unwrap();

    // a "formatter" that reverts everything back to the original text
    let formatter = format!("cat {}", fixture_path("core_bindings.cc"));
    let args: Vec<String> = sync_args(&bindings)
        .into_iter()
        .map(|a| if a == "cat" { formatter.clone() } else { a })
        .collect();
    cmd().args(&args).assert().success();

    assert_eq!(std::fs::read_to_string(&bindings).unwrap(), pristine);
}

#[test]
fn unparsable_call_site_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let bindings = dir.path().join("broken.cc");
    std::fs::write(&bindings, "cls.def(\"broken\", &Core::broken\n").unwrap();

    cmd()
        .args(sync_args(&bindings))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unbalanced"));
}

// -- inspect --

#[test]
fn inspect_lists_literals_with_spans() {
    cmd()
        .args(["inspect", &fixture_path("core_bindings.cc")])
        .assert()
        .success()
        .stdout(predicate::str::contains("getVersionInfo"))
        .stdout(predicate::str::contains("Stale text."))
        .stdout(predicate::str::contains("core_bindings.cc:21:"))
        .stdout(predicate::str::contains("shutdown").not());
}

#[test]
fn inspect_resolves_includes() {
    cmd()
        .args([
            "inspect",
            &fixture_path("core_bindings.cc"),
            "-I",
            &fixture_path("include"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("shutdown"))
        .stdout(predicate::str::contains("Shuts down the core"));
}

#[test]
fn inspect_json_output() {
    cmd()
        .args(["inspect", &fixture_path("core_bindings.cc"), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"binding\""))
        .stdout(predicate::str::contains("\"line\""));
}

#[test]
fn inspect_missing_file_fails() {
    cmd()
        .args(["inspect", "/nonexistent/bindings.cc"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read"));
}
