//! Tests for the tunnel-policy binary

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const POLICY: &str = r#"[[{"attribute":{"name":"role","type":"string"},"operator":"equal","value":["admin"]}]]"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tunnel-policy"))
}

fn evaluate(policy: &Path, input: &Path, extra: &[&str]) -> Output {
    command()
        .arg("--policy")
        .arg(policy)
        .arg("--input")
        .arg(input)
        .args(extra)
        .output()
        .unwrap()
}

#[test]
fn test_match_exits_zero() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);
    let input = write(&dir, "input.json", r#"{"role":"admin"}"#);

    let output = evaluate(&policy, &input, &[]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "true");
}

#[test]
fn test_no_match_exits_one() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);
    let input = write(&dir, "input.json", r#"{"role":"user"}"#);

    let output = command()
        .arg("-p")
        .arg(&policy)
        .arg("-i")
        .arg(&input)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "false");
}

#[test]
fn test_malformed_policy_is_no_match() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", "[[{");
    let input = write(&dir, "input.json", r#"{"role":"admin"}"#);

    let output = evaluate(&policy, &input, &[]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "false");
}

#[test]
fn test_missing_file_exits_two() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);
    let missing = dir.path().join("missing.json");

    let output = evaluate(&policy, &missing, &[]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.json"));
}

#[test]
fn test_input_from_stdin() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);

    let mut child = command()
        .arg("--policy")
        .arg(&policy)
        .args(["--input", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(br#"{"role":"admin"}"#)
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_explain_prints_trace() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);
    let input = write(&dir, "input.json", r#"{"role":["admin"]}"#);
    let config = write(&dir, "engine.toml", "short_circuit = false\n");
    let config = config.to_str().unwrap();

    let output = evaluate(&policy, &input, &["--config", config, "--explain"]);

    assert_eq!(output.status.code(), Some(1));
    let trace: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(trace["matched"], false);
    assert_eq!(trace["paths"][0]["conditions"][0]["shape"], "text_list");
    assert_eq!(
        trace["paths"][0]["conditions"][0]["reason"],
        "unsupported_operator"
    );
}

#[test]
fn test_explain_reports_malformed_input() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);
    let input = write(&dir, "input.json", "[1, 2]");

    let output = evaluate(&policy, &input, &["--explain"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Malformed input document"));
}

#[test]
fn test_invalid_config_exits_two() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);
    let input = write(&dir, "input.json", r#"{"role":"admin"}"#);
    let config = write(&dir, "engine.toml", "short_circuit = 3\n");
    let config = config.to_str().unwrap();

    let output = evaluate(&policy, &input, &["-c", config]);

    assert_eq!(output.status.code(), Some(2));
}
