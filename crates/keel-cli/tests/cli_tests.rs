use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn keel(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_keel"))
        .args(args)
        .arg("--no-color")
        .current_dir(dir)
        .output()
        .expect("failed to run keel")
}

fn text(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn test_check_clean_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("user.keel"),
        "resource User {\n  id: uuid! @primary\n  email: string! @email\n}\n",
    )
    .unwrap();

    let output = keel(dir.path(), &["check", "user.keel"]);

    assert!(output.status.success(), "{}", text(&output));
    assert!(text(&output).contains("Passed"));
}

#[test]
fn test_check_reports_every_diagnostic() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("good.keel"),
        "resource A {\n  x: int!\n}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("bad.keel"),
        "resource B {\n  name: string\n  kind: enum[]!\n}\n",
    )
    .unwrap();

    let output = keel(dir.path(), &["check", "good.keel", "bad.keel"]);
    let out = text(&output);

    assert!(!output.status.success());
    assert!(out.contains("missing its nullability marker"), "{}", out);
    assert!(out.contains("enum must declare at least one value"), "{}", out);
    assert!(out.contains("bad.keel:2:"), "{}", out);
    assert!(out.contains("2 diagnostics in 1 of 2 files"), "{}", out);
}

#[test]
fn test_check_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = keel(dir.path(), &["check", "nope.keel"]);

    assert!(!output.status.success());
    assert!(text(&output).contains("Failed to read nope.keel"));
}

#[test]
fn test_max_errors_truncates_output() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("bad.keel"),
        "resource B {\n  a: int\n  b: int\n  c: int\n}\n",
    )
    .unwrap();

    let output = keel(dir.path(), &["check", "bad.keel", "--max-errors", "1"]);

    assert!(text(&output).contains("... and 2 more"));
}

#[test]
fn test_config_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".keelrc"), "max_depth = 3\n").unwrap();
    fs::write(
        dir.path().join("deep.keel"),
        "resource A {\n  x: array<array<array<array<int>>>>!\n}\n",
    )
    .unwrap();

    let output = keel(dir.path(), &["config"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("max_depth = 3"));

    let output = keel(dir.path(), &["check", "deep.keel"]);
    assert!(!output.status.success());
    assert!(text(&output).contains("maximum depth of 3"));

    let output = keel(dir.path(), &["check", "deep.keel", "--max-depth", "16"]);
    assert!(output.status.success(), "{}", text(&output));
}

#[test]
fn test_tokens_command() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.keel"), "x: int! # note\n").unwrap();

    let output = keel(dir.path(), &["tokens", "a.keel"]);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(output.status.success());
    assert!(stdout.contains("Identifier(\"x\")"));
    assert!(!stdout.contains("Comment"));

    let output = keel(dir.path(), &["tokens", "a.keel", "--trivia"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Comment(\" note\")"));
}

#[test]
fn test_ast_command() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.keel"), "resource Account {\n  owner: User?\n}\n").unwrap();

    let output = keel(dir.path(), &["ast", "a.keel"]);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();

    assert!(output.status.success(), "{}", text(&output));
    assert!(stdout.contains("Account"));
    assert!(stdout.contains("relationships"));
}
