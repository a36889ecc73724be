#![cfg(feature = "cli")]

use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

fn roboframe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_roboframe"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("roboframe should run")
}

fn roboframe_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_roboframe"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("roboframe should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin.as_bytes())
        .expect("stdin should accept input");
    child.wait_with_output().expect("roboframe should finish")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

fn encode_rover() -> String {
    let output = roboframe(&[
        "encode",
        "rover_command",
        "--json",
        r#"{"throttle":0.8,"brake":0.0,"steering_angle":-0.2}"#,
    ]);
    assert!(output.status.success(), "{output:?}");
    String::from_utf8(output.stdout).expect("envelope should be utf-8")
}

#[test]
fn encode_prints_envelope() {
    let envelope: Value = serde_json::from_str(&encode_rover()).expect("envelope json");
    assert_eq!(envelope["message_type"], "command");
    assert_eq!(envelope["schema_name"], "rover_command");
    assert!(envelope["arrow_data"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(envelope["timestamp"].as_u64().is_some_and(|t| t > 0));
}

#[test]
fn encode_then_decode_roundtrips() {
    let output = roboframe_with_stdin(&["decode"], &encode_rover());
    assert!(output.status.success(), "{output:?}");

    let decoded = stdout_json(&output);
    assert_eq!(decoded["schema_name"], "rover_command");
    assert_eq!(decoded["event"], "arrow_rover_command");
    assert_eq!(decoded["record"]["throttle"], 0.8);
    assert_eq!(decoded["record"]["steering_angle"], -0.2);
    assert!(decoded["record"]["command_id"].as_str().is_some());
    assert_eq!(decoded["corrupted"], serde_json::json!([]));
}

#[test]
fn arm_command_defaults_survive_the_wire() {
    let output = roboframe(&[
        "encode",
        "arm_command",
        "--json",
        r#"{"type":"cartesian_move","x":0.3,"y":0.1,"z":0.5}"#,
    ]);
    assert!(output.status.success(), "{output:?}");
    let envelope = String::from_utf8(output.stdout).expect("utf-8");

    let output = roboframe_with_stdin(&["decode", "--expect", "arm_command"], &envelope);
    assert!(output.status.success(), "{output:?}");
    let record = &stdout_json(&output)["record"];
    assert_eq!(record["type"], "cartesian_move");
    assert_eq!(record["x"], 0.3);
    assert_eq!(record["roll"], 0.0);
    assert_eq!(record["max_velocity"], 0.0);
    assert!(record.get("joint_angles").is_none());
}

#[test]
fn decode_rejects_unexpected_schema() {
    let output = roboframe_with_stdin(&["decode", "--expect", "arm_command"], &encode_rover());
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn decode_bad_base64_returns_3() {
    let envelope = r#"{"message_type":"command","schema_name":"rover_command","arrow_data":"***","timestamp":1}"#;
    let output = roboframe_with_stdin(&["decode"], envelope);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn decode_invalid_envelope_returns_60() {
    let output = roboframe_with_stdin(&["decode"], r#"{"schema_name":"rover_command"}"#);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid envelope"));
}

#[test]
fn decode_truncated_frame_returns_60() {
    let envelope = r#"{"message_type":"command","schema_name":"rover_command","arrow_data":"/////w==","timestamp":1}"#;
    let output = roboframe_with_stdin(&["decode"], envelope);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn encode_unknown_schema_returns_64() {
    let output = roboframe(&["encode", "camera_frame", "--json", "{}"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn encode_missing_required_field_returns_60() {
    let output = roboframe(&["encode", "rover_command", "--json", r#"{"throttle":0.5}"#]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn encode_rejects_non_json_input() {
    let output = roboframe(&["encode", "rover_command", "--json", "throttle=1"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn schema_describes_fields_in_wire_order() {
    let output = roboframe(&["schema", "rover_command"]);
    assert!(output.status.success(), "{output:?}");

    let described = stdout_json(&output);
    assert_eq!(described["message_type"], "command");
    let names: Vec<&str> = described["fields"]
        .as_array()
        .expect("fields array")
        .iter()
        .filter_map(|f| f["name"].as_str())
        .collect();
    assert_eq!(
        names,
        ["throttle", "brake", "steering_angle", "timestamp", "command_id"]
    );
}

#[test]
fn version_reports_package_version() {
    let output = roboframe(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));

    let output = roboframe(&["version", "--extended"]);
    assert!(output.status.success());
    let payload = stdout_json(&output);
    assert_eq!(
        payload.get("version").and_then(|v| v.as_str()),
        Some(env!("CARGO_PKG_VERSION"))
    );
}
