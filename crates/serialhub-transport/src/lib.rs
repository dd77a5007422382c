//! Serial link transport abstraction.
//!
//! The lowest layer of serialhub. Everything above it treats the link as an
//! opaque blocking byte source/sink with a read timeout:
//! - [`SerialLink`] is a connected handle (`Read + Write` plus buffer control)
//! - [`Connector`] opens a handle for a port name and baud rate
//!
//! [`SerialConnector`] is the `serialport`-backed implementation used by the CLI.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{list_ports, PortInfo, SerialConnector, SerialPortLink};
pub use traits::{is_timeout, Connector, SerialLink};
