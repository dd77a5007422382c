use crate::config::ConfigError;

/// Errors that can occur while driving a serial link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No transport is open.
    #[error("serial port not connected")]
    NotConnected,

    /// A transport is already open.
    #[error("serial port already connected")]
    AlreadyConnected,

    /// The read loop is already running.
    #[error("link driver already running")]
    AlreadyRunning,

    /// Opening or configuring the transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] serialhub_transport::TransportError),

    /// Reading from the transport failed. The link has been closed.
    #[error("serial read failed: {0}")]
    Read(std::io::Error),

    /// Writing a command failed. The link has been closed.
    #[error("serial write failed: {0}")]
    Write(std::io::Error),

    /// The ring buffer could not absorb a read. The link has been closed.
    #[error("ring buffer overflow (capacity {capacity})")]
    RingOverflow { capacity: usize },

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] serialhub_frame::FrameError),

    /// A worker thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LinkError>;
