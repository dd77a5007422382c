#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "serialhub-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn serialhub(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_serialhub"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("serialhub should run")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be one JSON document")
}

fn encode_frame(message_size: &str, payload_hex: &str) -> String {
    let out = stdout_json(&serialhub(&[
        "encode",
        "--message-size",
        message_size,
        "--hex",
        payload_hex,
    ]));
    out["frame"]
        .as_str()
        .expect("frame should be a hex string")
        .to_string()
}

#[test]
fn encode_prints_stuffed_frame() {
    let out = stdout_json(&serialhub(&[
        "encode",
        "--message-size",
        "12",
        "--delimiter",
        "0xCF",
        "--hex",
        "0102",
    ]));

    assert_eq!(out["payload_size"], 2);
    assert_eq!(out["frame_size"], 14);
    let frame = out["frame"].as_str().unwrap();
    assert!(frame.ends_with("cf"));
    let inner_delimiters = frame[..frame.len() - 2]
        .as_bytes()
        .chunks(2)
        .filter(|pair| *pair == b"cf")
        .count();
    assert_eq!(inner_delimiters, 0);
}

#[test]
fn encode_then_decode_round_trips() {
    let frame = encode_frame("12", "0102");
    let out = stdout_json(&serialhub(&[
        "decode",
        &frame,
        "--message-size",
        "12",
        "--verify",
    ]));

    assert_eq!(out["size"], 12);
    let message = out["message"].as_str().unwrap();
    assert!(message.starts_with("0102000000000000"));
    assert_eq!(out["desired_hash"], out["calculated_hash"]);
}

#[test]
fn decode_with_single_schema_file() {
    let dir = unique_temp_dir("schema");
    let schema = dir.join("fields.json");
    std::fs::write(
        &schema,
        r#"{"fields":[{"name":"A","startIdx":0,"endIdx":1},{"startIdx":2,"endIdx":3}]}"#,
    )
    .unwrap();

    let frame = encode_frame("12", "0102");
    let out = stdout_json(&serialhub(&[
        "decode",
        &frame,
        "--message-size",
        "12",
        "--schema",
        schema.to_str().unwrap(),
    ]));

    assert_eq!(out["fields"]["A"], 0x0201);
    assert_eq!(out["hash_valid"], true);
    assert_eq!(
        out["fields"]["DesiredHash"],
        out["fields"]["CalculatedHash"]
    );
    assert!(out.get("version").is_none());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_selects_schema_by_version_key() {
    let dir = unique_temp_dir("registry");
    std::fs::write(
        dir.join("258.json"),
        r#"{"fields":[
            {"name":"Temp","startIdx":0,"endIdx":1},
            {"name":"Version","startIdx":7,"endIdx":8}
        ]}"#,
    )
    .unwrap();

    let frame = encode_frame("16", "2c01000000000002 01");
    let out = stdout_json(&serialhub(&[
        "decode",
        &frame,
        "--message-size",
        "16",
        "--schemas",
        dir.to_str().unwrap(),
    ]));

    assert_eq!(out["version"], 258);
    assert_eq!(out["fields"]["Version"], 258);
    assert_eq!(out["fields"]["Temp"], 300);
    assert_eq!(out["hash_valid"], true);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_unknown_version_is_data_invalid() {
    let dir = unique_temp_dir("unknown");
    let frame = encode_frame("16", "00000000000000ffff");
    let output = serialhub(&[
        "decode",
        &frame,
        "--message-size",
        "16",
        "--schemas",
        dir.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("65535"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn verify_rejects_bad_checksum() {
    let output = serialhub(&[
        "decode",
        "0102000000000000deadbeef",
        "--message-size",
        "12",
        "--unstuffed",
        "--verify",
    ]);

    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("checksum mismatch"));
}

#[test]
fn decode_with_wrong_message_size_is_data_invalid() {
    let frame = encode_frame("12", "01");
    let output = serialhub(&["decode", &frame, "--message-size", "16"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn oversized_payload_is_rejected() {
    let output = serialhub(&[
        "encode",
        "--message-size",
        "8",
        "--hex",
        "0102030405",
    ]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn malformed_hex_is_usage_error() {
    let output = serialhub(&["decode", "abc", "--message-size", "12"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_crate_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_serialhub"))
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("serialhub {}", env!("CARGO_PKG_VERSION"))
    );
}
