//! CLI tests for the `asm` binary.
//!
//! Spawns the binary in a temp directory and checks exit codes and the JSON
//! printed on stdout.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use asm::exit_codes;
use serde_json::Value;

fn asm(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_asm"))
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("run asm")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

#[test]
fn status_without_session_exits_no_session() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = asm(temp.path(), &["status"]);
    assert_eq!(output.status.code(), Some(exit_codes::NO_SESSION));

    let json = stdout_json(&output);
    assert_eq!(json["status"], "error");
    assert_eq!(json["kind"], "no_active_session");
}

#[test]
fn full_cycle_succeeds() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cwd = temp.path();

    let init = asm(cwd, &["init", "--name", "demo"]);
    assert_eq!(init.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout_json(&init)["status"], "success");

    assert_eq!(
        asm(cwd, &["transition", "MAIN", "init_done"]).status.code(),
        Some(exit_codes::OK)
    );

    let start = asm(cwd, &["conv-start"]);
    assert_eq!(stdout_json(&start)["conversation_id"], "conv_001");

    let delegate = asm(cwd, &["delegate", "data-engineer", "build", "the", "report"]);
    let json = stdout_json(&delegate);
    assert_eq!(json["task_tool_params"]["subagent_type"], "data-engineer");
    assert_eq!(json["task_tool_params"]["description"], "build the report");

    let denied = asm(cwd, &["can-write", "deploy.sh"]);
    assert_eq!(denied.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout_json(&denied)["allowed"], false);

    let end = asm(cwd, &["conv-end", "built", "report"]);
    let json = stdout_json(&end);
    assert_eq!(json["entry"]["summary"], "built report");

    let history = asm(cwd, &["history"]);
    assert_eq!(stdout_json(&history)["conversations"][0]["conversation_id"], "conv_001");
}

#[test]
fn init_records_mode() {
    let temp = tempfile::tempdir().expect("tempdir");
    let init = asm(temp.path(), &["init", "--name", "demo", "--mode", "orchestrator"]);
    assert_eq!(init.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout_json(&init)["record"]["data"]["mode"], "orchestrator");
}

#[test]
fn end_without_start_exits_no_conversation() {
    let temp = tempfile::tempdir().expect("tempdir");
    asm(temp.path(), &["init", "--name", "demo"]);
    let output = asm(temp.path(), &["conv-end"]);
    assert_eq!(output.status.code(), Some(exit_codes::NO_CONVERSATION));
    assert_eq!(stdout_json(&output)["kind"], "no_active_conversation");
}

#[test]
fn blank_state_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    asm(temp.path(), &["init", "--name", "demo"]);
    let output = asm(temp.path(), &["transition", "  "]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert_eq!(stdout_json(&output)["kind"], "invalid_input");
}

#[test]
fn log_reads_request_from_stdin() {
    let temp = tempfile::tempdir().expect("tempdir");
    asm(temp.path(), &["init", "--name", "demo"]);
    let session = temp.path().join(".asm").join("demo");
    let request = serde_json::json!({
        "session_path": session,
        "conversation_data": {
            "conversation_id": "conv_001",
            "timestamp": "2025-09-18T08:10:09",
            "summary": "Logged externally",
            "files_created": [],
            "agents_used": []
        }
    });

    let mut child = Command::new(env!("CARGO_BIN_EXE_asm"))
        .current_dir(temp.path())
        .arg("log")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn asm log");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(request.to_string().as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let index = std::fs::read_to_string(session.join("conversations/messages.jsonl"))
        .expect("read index");
    assert!(index.contains("Logged externally"));
}
