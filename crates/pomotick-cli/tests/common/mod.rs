//! Common utilities for CLI E2E tests.

use std::path::Path;
use std::process::Command;

/// Invoke the CLI against an isolated data directory.
pub fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_pomotick"))
        .args(args)
        .env("POMOTICK_DATA_DIR", data_dir)
        .env_remove("POMOTICK_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Invoke a CLI command and expect success.
pub fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command failed with code {code}: {args:?}\n{stderr}");
    stdout
}

/// Parse the stream of pretty-printed JSON documents the CLI writes.
pub fn parse_json_stream(stdout: &str) -> Vec<serde_json::Value> {
    serde_json::Deserializer::from_str(stdout)
        .into_iter::<serde_json::Value>()
        .collect::<Result<_, _>>()
        .expect("Failed to parse JSON output")
}

/// The trailing StateSnapshot every timer command prints.
pub fn last_status(stdout: &str) -> serde_json::Value {
    let docs = parse_json_stream(stdout);
    let last = docs.last().cloned().expect("no JSON output");
    assert_eq!(last["type"], "StateSnapshot");
    last
}
