use std::fmt;
use std::io;

use serialhub_frame::FrameError;
use serialhub_link::LinkError;
use serialhub_schema::SchemaError;
use serialhub_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = io_kind_code(err.kind());
    CliError::new(code, format!("{context}: {err}"))
}

fn io_kind_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::Open { ref source, .. } | TransportError::Configure { ref source, .. } => {
            let code = match source.kind() {
                serialport::ErrorKind::Io(kind) if kind == io::ErrorKind::PermissionDenied => {
                    PERMISSION_DENIED
                }
                serialport::ErrorKind::InvalidInput => USAGE,
                _ => TRANSPORT_ERROR,
            };
            CliError::new(code, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::EmptyInput
        | FrameError::ZeroLength { .. }
        | FrameError::TruncatedFrame { .. }
        | FrameError::SizeMismatch { .. }
        | FrameError::PayloadTooLarge { .. }
        | FrameError::ChecksumWindow { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::InvalidLayout(_) => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn schema_error(context: &str, err: SchemaError) -> CliError {
    match err {
        SchemaError::Frame(err) => frame_error(context, err),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Config(_) => CliError::new(USAGE, format!("{context}: {err}")),
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::Read(ref source) | LinkError::Write(ref source) => {
            CliError::new(io_kind_code(source.kind()), format!("{context}: {err}"))
        }
        LinkError::RingOverflow { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_by_kind() {
        let err = io_error(
            "open",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
        assert_eq!(err.message, "open: denied");

        let err = io_error("read", io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn malformed_frames_are_data_invalid() {
        let err = frame_error(
            "decode",
            FrameError::SizeMismatch {
                expected: 13,
                actual: 12,
            },
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = schema_error("decode", SchemaError::UnknownVersion(9));
        assert_eq!(err.code, DATA_INVALID);

        let err = schema_error("decode", SchemaError::Frame(FrameError::EmptyInput));
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn link_errors_follow_their_cause() {
        let err = link_error(
            "monitor",
            LinkError::Read(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);

        let err = link_error("monitor", LinkError::RingOverflow { capacity: 8 });
        assert_eq!(err.code, FAILURE);

        let err = link_error("monitor", LinkError::NotConnected);
        assert_eq!(err.code, INTERNAL);
    }
}
