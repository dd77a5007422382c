use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A connected serial link. Implements Read + Write.
///
/// Reads block for at most the configured read timeout. A timeout surfaces as
/// an `io::Error` of kind `TimedOut` (or `WouldBlock` on some platforms);
/// use [`is_timeout`] to tell it apart from a real link failure.
pub trait SerialLink: Read + Write + Send {
    /// Set the timeout applied to blocking reads.
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Discard bytes received but not yet read.
    fn reset_input_buffer(&mut self) -> Result<()>;

    /// Discard bytes written but not yet transmitted.
    fn reset_output_buffer(&mut self) -> Result<()>;

    /// Port identity for diagnostics.
    fn port_name(&self) -> &str;
}

impl<L: SerialLink + ?Sized> SerialLink for Box<L> {
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        (**self).reset_input_buffer()
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        (**self).reset_output_buffer()
    }

    fn port_name(&self) -> &str {
        (**self).port_name()
    }
}

/// Opens serial links.
pub trait Connector: Send + Sync {
    /// The link type produced by this connector.
    type Link: SerialLink + 'static;

    /// Open `port` at `baud_rate`.
    fn open(&self, port: &str, baud_rate: u32) -> Result<Self::Link>;
}

/// Returns true if the error is a read timeout rather than a link failure.
pub fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}
