use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serialhub_frame::{checksum_with_mask, stored_checksum, NO_MASK};
use serialhub_schema::DecodedRecord;
use serialhub_transport::PortInfo;

use crate::hex;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    hash_valid: bool,
    fields: &'a DecodedRecord,
    timestamp: String,
}

pub fn print_record(version: Option<u32>, record: &DecodedRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = RecordOutput {
                version,
                hash_valid: record.is_hash_valid(),
                fields: record,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            if let Some(version) = version {
                table.add_row(vec!["(version)".to_string(), version.to_string()]);
            }
            for (name, value) in record {
                table.add_row(vec![name.clone(), value.to_string()]);
            }
            table.add_row(vec![
                "(hash)".to_string(),
                hash_label(record.is_hash_valid()).to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = String::new();
            if let Some(version) = version {
                line.push_str(&format!("version={version} "));
            }
            line.push_str(&format!("hash={}", hash_label(record.is_hash_valid())));
            for (name, value) in record {
                line.push_str(&format!(" {name}={value}"));
            }
            println!("{line}");
        }
    }
}

#[derive(Serialize)]
struct MessageOutput {
    size: usize,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    desired_hash: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calculated_hash: Option<u32>,
    timestamp: String,
}

/// Print an unstuffed message that was not decoded against a schema.
pub fn print_message(message: &[u8], format: OutputFormat) {
    let desired = stored_checksum(message).ok();
    let calculated = checksum_with_mask(message, NO_MASK).ok();
    let hash = match (desired, calculated) {
        (Some(d), Some(c)) => hash_label(d == c),
        _ => "n/a",
    };

    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                size: message.len(),
                message: hex::encode(message),
                desired_hash: desired,
                calculated_hash: calculated,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["SIZE", "HASH", "MESSAGE"]);
            table.add_row(vec![
                message.len().to_string(),
                hash.to_string(),
                hex::encode(message),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "size={} hash={} message={}",
                message.len(),
                hash,
                hex::encode(message)
            );
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput {
    payload_size: usize,
    frame_size: usize,
    frame: String,
}

pub fn print_encoded(payload: &[u8], frame: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                payload_size: payload.len(),
                frame_size: frame.len(),
                frame: hex::encode(frame),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["PAYLOAD", "FRAME SIZE", "FRAME"]);
            table.add_row(vec![
                payload.len().to_string(),
                frame.len().to_string(),
                hex::encode(frame),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", hex::encode(frame)),
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manufacturer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product: Option<&'a str>,
}

impl<'a> From<&'a PortInfo> for PortOutput<'a> {
    fn from(port: &'a PortInfo) -> Self {
        Self {
            name: &port.name,
            vid: port.vid,
            pid: port.pid,
            manufacturer: port.manufacturer.as_deref(),
            product: port.product.as_deref(),
        }
    }
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports.iter().map(PortOutput::from).collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["PORT", "VID:PID", "MANUFACTURER", "PRODUCT"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    usb_id(port),
                    port.manufacturer.clone().unwrap_or_default(),
                    port.product.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                let id = usb_id(port);
                if id.is_empty() {
                    println!("{}", port.name);
                } else {
                    println!("{} ({id})", port.name);
                }
            }
        }
    }
}

fn usb_id(port: &PortInfo) -> String {
    match (port.vid, port.pid) {
        (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
        _ => String::new(),
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn hash_label(valid: bool) -> &'static str {
    if valid {
        "ok"
    } else {
        "mismatch"
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_id_formats_vid_pid() {
        let port = PortInfo {
            name: "/dev/ttyACM0".to_string(),
            vid: Some(0x2341),
            pid: Some(0x43),
            manufacturer: None,
            product: None,
        };
        assert_eq!(usb_id(&port), "2341:0043");

        let plain = PortInfo {
            vid: None,
            pid: None,
            ..port
        };
        assert_eq!(usb_id(&plain), "");
    }

    #[test]
    fn port_output_skips_missing_usb_fields() {
        let port = PortInfo {
            name: "COM3".to_string(),
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        };
        let json = serde_json::to_string(&PortOutput::from(&port)).unwrap();
        assert_eq!(json, r#"{"name":"COM3"}"#);
    }
}
