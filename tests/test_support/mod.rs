#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tempfile::TempDir;

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn temp_workspace(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("create temp workspace")
}

fn spawn_with(configure: impl FnOnce(&mut Command)) -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_tutord");
    let mut cmd = Command::new(exe);
    cmd.env_remove("TUTORD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    configure(&mut cmd);
    let mut child = cmd.spawn().expect("spawn tutord");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
        next_id: 0,
    }
}

pub fn spawn_sidecar() -> Sidecar {
    spawn_with(|_| {})
}

pub fn spawn_sidecar_with_args(args: &[&str]) -> Sidecar {
    spawn_with(|cmd| {
        cmd.args(args);
    })
}

/// Spawns the sidecar and selects `workspace` before returning it.
pub fn spawn_in_workspace(workspace: &Path) -> Sidecar {
    let mut sc = spawn_sidecar();
    request_ok(
        &mut sc,
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    sc
}

pub fn send_raw(sc: &mut Sidecar, line: &str) -> serde_json::Value {
    writeln!(sc.stdin, "{}", line).expect("write request");
    sc.stdin.flush().expect("flush request");
    let mut out = String::new();
    sc.reader.read_line(&mut out).expect("read response line");
    assert!(!out.trim().is_empty(), "empty response for {}", line);
    serde_json::from_str(out.trim()).expect("parse response json")
}

pub fn request(sc: &mut Sidecar, method: &str, params: serde_json::Value) -> serde_json::Value {
    sc.next_id += 1;
    let id = format!("r{}", sc.next_id);
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    let value = send_raw(sc, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
    value
}

pub fn request_ok(sc: &mut Sidecar, method: &str, params: serde_json::Value) -> serde_json::Value {
    let value = request(sc, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(json!({}))
}

/// Returns the error code of a failed response.
pub fn request_err(sc: &mut Sidecar, method: &str, params: serde_json::Value) -> String {
    let value = request(sc, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .pointer("/error/code")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

pub fn str_at<'a>(value: &'a serde_json::Value, pointer: &str) -> &'a str {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("missing string at {} in {}", pointer, value))
}
