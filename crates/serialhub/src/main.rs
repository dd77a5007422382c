mod cmd;
mod exit;
mod hex;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "serialhub", version, about = "Framed serial link monitor and codec")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parses_monitor_subcommand() {
        let cli = Cli::try_parse_from([
            "serialhub",
            "monitor",
            "/dev/ttyACM0",
            "--baud",
            "115200",
            "--delimiter",
            "0x00",
            "--message-size",
            "32",
            "--schemas",
            "specs",
            "--delay-after-read",
            "0ms",
        ])
        .expect("monitor args should parse");

        let Command::Monitor(args) = cli.command else {
            panic!("expected monitor");
        };
        assert_eq!(args.port.port, "/dev/ttyACM0");
        assert_eq!(args.port.baud, 115_200);
        assert_eq!(args.port.read_timeout, Duration::from_millis(100));
        assert_eq!(args.frame.delimiter, 0);
        assert_eq!(args.frame.message_size, 32);
        assert_eq!(args.schema.version_start, 7);
        assert_eq!(args.schema.version_end, 8);
        assert_eq!(args.delay_after_read, Duration::ZERO);
        assert!(!args.no_flush);
    }

    #[test]
    fn frame_defaults_match_reference_device() {
        let cli = Cli::try_parse_from(["serialhub", "encode", "--hex", "01"])
            .expect("encode args should parse");
        let Command::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.frame.message_size, 56);
        assert_eq!(args.frame.delimiter, 0xCF);
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "serialhub",
            "send",
            "/dev/ttyUSB0",
            "--hex",
            "0102",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_conflicting_schema_args() {
        let err = Cli::try_parse_from([
            "serialhub",
            "decode",
            "00",
            "--schema",
            "a.json",
            "--schemas",
            "dir",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_out_of_range_delimiter() {
        let err = Cli::try_parse_from(["serialhub", "encode", "--delimiter", "0x100"])
            .expect_err("delimiter should be a byte");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
