use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use serialhub_frame::{FrameLayout, DEFAULT_DATA_BUFFER_SIZE, DEFAULT_READ_BUFFER_SIZE};
use serialhub_link::{DEFAULT_DELIMITER, DEFAULT_MESSAGE_SIZE, DEFAULT_OUTPUT_QUEUE_DEPTH};

use crate::exit::{frame_error, io_error, CliResult};
use crate::hex;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod monitor;
pub mod ports;
pub mod records;
pub mod send;
pub mod version;

/// Baud rate of the reference device firmware.
pub const DEFAULT_BAUD_RATE: u32 = 460_800;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read frames from a serial port and print decoded records.
    Monitor(MonitorArgs),
    /// Frame one command payload and write it to a serial port.
    Send(SendArgs),
    /// Frame a command payload offline and print it as hex.
    Encode(EncodeArgs),
    /// Unstuff a hex frame offline and decode it.
    Decode(DecodeArgs),
    /// List available serial ports.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone)]
pub struct PortArgs {
    /// Serial port (e.g. /dev/ttyACM0, COM3).
    pub port: String,
    /// Baud rate.
    #[arg(long, short = 'b', default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Read timeout (e.g. 100ms, 1s).
    #[arg(long, value_parser = parse_duration, default_value = "100ms")]
    pub read_timeout: Duration,
}

#[derive(Args, Debug, Clone)]
pub struct FrameArgs {
    /// Unstuffed message size, including the 4-byte checksum trailer.
    #[arg(long, default_value_t = DEFAULT_MESSAGE_SIZE)]
    pub message_size: usize,
    /// Frame delimiter byte (decimal or 0x hex).
    #[arg(long, value_parser = hex::parse_byte, default_value_t = DEFAULT_DELIMITER)]
    pub delimiter: u8,
}

impl FrameArgs {
    pub fn layout(&self) -> CliResult<FrameLayout> {
        FrameLayout::new(self.message_size, self.delimiter)
            .map_err(|err| frame_error("invalid frame layout", err))
    }
}

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Directory of `<version>.json` schema documents.
    #[arg(long, value_name = "DIR", conflicts_with = "schema")]
    pub schemas: Option<PathBuf>,
    /// A single schema document applied to every message.
    #[arg(long, value_name = "FILE", conflicts_with = "schemas")]
    pub schema: Option<PathBuf>,
    /// First byte of the little-endian version key.
    #[arg(long, default_value_t = 7)]
    pub version_start: usize,
    /// Last byte (inclusive) of the version key.
    #[arg(long, default_value_t = 8)]
    pub version_end: usize,
    /// Reject unknown keys in schema documents.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PayloadArgs {
    /// Payload as hex.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Payload as a UTF-8 string.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Read payload bytes from a file.
    #[arg(long, conflicts_with_all = ["hex", "data"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(text) = &self.hex {
            return hex::decode(text);
        }
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(path) = &self.file {
            return std::fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub port: PortArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
    #[command(flatten)]
    pub schema: SchemaArgs,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Bytes requested per transport read.
    #[arg(long, default_value_t = DEFAULT_READ_BUFFER_SIZE)]
    pub read_buffer_size: usize,
    /// Ring buffer capacity.
    #[arg(long, default_value_t = DEFAULT_DATA_BUFFER_SIZE)]
    pub data_buffer_size: usize,
    /// Pause after every transport read (e.g. 10ms, 0ms).
    #[arg(long, value_parser = parse_duration, default_value = "10ms")]
    pub delay_after_read: Duration,
    /// Capacity of each output queue.
    #[arg(long, default_value_t = DEFAULT_OUTPUT_QUEUE_DEPTH)]
    pub queue_depth: usize,
    /// Keep bytes already buffered by the port instead of discarding them.
    #[arg(long)]
    pub no_flush: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub port: PortArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
    #[command(flatten)]
    pub payload: PayloadArgs,
    #[command(flatten)]
    pub schema: SchemaArgs,
    /// Wait for one response message and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, value_parser = parse_duration, default_value = "5s")]
    pub wait_timeout: Duration,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub frame: FrameArgs,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Stuffed frame as hex, with or without the trailing delimiter.
    pub frame_hex: String,
    #[command(flatten)]
    pub frame: FrameArgs,
    #[command(flatten)]
    pub schema: SchemaArgs,
    /// Input is an already unstuffed message.
    #[arg(long)]
    pub unstuffed: bool,
    /// Exit with a data error when the checksum does not match.
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::USAGE;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn payload_sources() {
        let args = PayloadArgs {
            hex: Some("01 02".to_string()),
            data: None,
            file: None,
        };
        assert_eq!(args.resolve().unwrap(), vec![1, 2]);

        let args = PayloadArgs {
            hex: None,
            data: Some("hi".to_string()),
            file: None,
        };
        assert_eq!(args.resolve().unwrap(), b"hi".to_vec());

        let args = PayloadArgs {
            hex: None,
            data: None,
            file: None,
        };
        assert!(args.resolve().unwrap().is_empty());
    }

    #[test]
    fn frame_args_validate_layout() {
        let args = FrameArgs {
            message_size: 4,
            delimiter: 0,
        };
        assert_eq!(args.layout().unwrap_err().code, USAGE);
    }
}
