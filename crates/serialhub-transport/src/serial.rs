use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort, SerialPortInfo, SerialPortType};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{Connector, SerialLink};

/// Default read timeout applied when a port is opened.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A serial port opened through the `serialport` crate.
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialPortLink {
    /// Wrap an already opened port.
    pub fn new(port: Box<dyn SerialPort>, name: impl Into<String>) -> Self {
        Self {
            port,
            name: name.into(),
        }
    }

    fn configure_error(&self, source: serialport::Error) -> TransportError {
        TransportError::Configure {
            port: self.name.clone(),
            source,
        }
    }
}

impl Read for SerialPortLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialPortLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl SerialLink for SerialPortLink {
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| self.configure_error(e))
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| self.configure_error(e))
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Output)
            .map_err(|e| self.configure_error(e))
    }

    fn port_name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("port", &self.name)
            .finish()
    }
}

/// Opens ports as 8N1 without flow control.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    read_timeout: Duration,
}

impl SerialConnector {
    /// Create a connector with the default read timeout.
    pub fn new() -> Self {
        Self::with_read_timeout(DEFAULT_READ_TIMEOUT)
    }

    /// Create a connector with an explicit initial read timeout.
    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl Default for SerialConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SerialConnector {
    type Link = SerialPortLink;

    fn open(&self, port: &str, baud_rate: u32) -> Result<SerialPortLink> {
        let opened = serialport::new(port, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: port.to_string(),
                source,
            })?;

        info!(port, baud_rate, "opened serial port");
        Ok(SerialPortLink::new(opened, port))
    }
}

/// Information about an available serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name (e.g. "/dev/ttyUSB0" or "COM3").
    pub name: String,
    /// USB vendor ID, for USB devices.
    pub vid: Option<u16>,
    /// USB product ID, for USB devices.
    pub pid: Option<u16>,
    /// Manufacturer string, when reported.
    pub manufacturer: Option<String>,
    /// Product string, when reported.
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, manufacturer, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (
                Some(usb.vid),
                Some(usb.pid),
                usb.manufacturer,
                usb.product,
            ),
            _ => (None, None, None, None),
        };

        Self {
            name: info.port_name,
            vid,
            pid,
            manufacturer,
            product,
        }
    }
}

/// List available serial ports: ttyACM* first, then ttyUSB*, then the rest.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let available = serialport::available_ports().map_err(|err| {
        TransportError::Io(std::io::Error::other(format!(
            "serial port enumeration failed: {err}"
        )))
    })?;

    let mut by_name: HashMap<String, PortInfo> = HashMap::new();
    for info in available {
        let port = PortInfo::from(info);
        by_name.entry(port.name.clone()).or_insert(port);
    }

    let mut ports: Vec<PortInfo> = by_name.into_values().collect();
    ports.sort_by_key(|p| port_sort_key(&p.name));
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports)
}

fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        return (0, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        return (1, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    (2, 0, basename.to_string())
}
