use std::time::Duration;

use serialhub_frame::{
    FrameLayout, DEFAULT_DATA_BUFFER_SIZE, DEFAULT_READ_BUFFER_SIZE, MAX_MESSAGE_SIZE,
    MIN_MESSAGE_SIZE,
};

/// Unstuffed message size used by the reference device firmware.
pub const DEFAULT_MESSAGE_SIZE: usize = 56;

/// Frame delimiter used by the reference device firmware.
pub const DEFAULT_DELIMITER: u8 = 0xCF;

/// Pause after every transport read.
pub const DEFAULT_DELAY_AFTER_READ: Duration = Duration::from_millis(10);

/// Transport read timeout. Bounds how long a stop request can go unnoticed.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Capacity of each output queue.
pub const DEFAULT_OUTPUT_QUEUE_DEPTH: usize = 64;

/// Invalid [`HubConfig`] combination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("port name is empty")]
    EmptyPort,

    #[error("baud rate must be positive")]
    ZeroBaudRate,

    #[error("message size {size} outside {min}..={max}")]
    MessageSize { size: usize, min: usize, max: usize },

    #[error("read buffer size must be positive")]
    ZeroReadBuffer,

    #[error("data buffer ({data} bytes) smaller than read buffer ({read} bytes)")]
    DataBufferTooSmall { data: usize, read: usize },

    #[error("read timeout must be positive")]
    ZeroReadTimeout,

    #[error("output queue depth must be positive")]
    ZeroQueueDepth,
}

/// Validated link settings. Build with [`HubConfig::builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    port: String,
    baud_rate: u32,
    layout: FrameLayout,
    read_buffer_size: usize,
    data_buffer_size: usize,
    delay_after_read: Duration,
    read_timeout: Duration,
    output_queue_depth: usize,
}

impl HubConfig {
    pub fn builder(port: impl Into<String>, baud_rate: u32) -> HubConfigBuilder {
        HubConfigBuilder::new(port, baud_rate)
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Frame geometry (message size and delimiter).
    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn message_size(&self) -> usize {
        self.layout.message_size()
    }

    pub fn message_delimiter(&self) -> u8 {
        self.layout.delimiter()
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// Ring buffer capacity.
    pub fn data_buffer_size(&self) -> usize {
        self.data_buffer_size
    }

    pub fn delay_after_read(&self) -> Duration {
        self.delay_after_read
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn output_queue_depth(&self) -> usize {
        self.output_queue_depth
    }
}

#[derive(Debug, Clone)]
pub struct HubConfigBuilder {
    port: String,
    baud_rate: u32,
    message_size: usize,
    message_delimiter: u8,
    read_buffer_size: usize,
    data_buffer_size: usize,
    delay_after_read: Duration,
    read_timeout: Duration,
    output_queue_depth: usize,
}

impl HubConfigBuilder {
    fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            message_size: DEFAULT_MESSAGE_SIZE,
            message_delimiter: DEFAULT_DELIMITER,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            data_buffer_size: DEFAULT_DATA_BUFFER_SIZE,
            delay_after_read: DEFAULT_DELAY_AFTER_READ,
            read_timeout: DEFAULT_READ_TIMEOUT,
            output_queue_depth: DEFAULT_OUTPUT_QUEUE_DEPTH,
        }
    }

    /// Unstuffed message length including the 4-byte checksum.
    pub fn message_size(mut self, size: usize) -> Self {
        self.message_size = size;
        self
    }

    pub fn message_delimiter(mut self, delimiter: u8) -> Self {
        self.message_delimiter = delimiter;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn data_buffer_size(mut self, size: usize) -> Self {
        self.data_buffer_size = size;
        self
    }

    pub fn delay_after_read(mut self, delay: Duration) -> Self {
        self.delay_after_read = delay;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn output_queue_depth(mut self, depth: usize) -> Self {
        self.output_queue_depth = depth;
        self
    }

    pub fn build(self) -> Result<HubConfig, ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::EmptyPort);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }
        let layout = FrameLayout::new(self.message_size, self.message_delimiter).map_err(|_| {
            ConfigError::MessageSize {
                size: self.message_size,
                min: MIN_MESSAGE_SIZE,
                max: MAX_MESSAGE_SIZE,
            }
        })?;
        if self.read_buffer_size == 0 {
            return Err(ConfigError::ZeroReadBuffer);
        }
        if self.data_buffer_size < self.read_buffer_size {
            return Err(ConfigError::DataBufferTooSmall {
                data: self.data_buffer_size,
                read: self.read_buffer_size,
            });
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroReadTimeout);
        }
        if self.output_queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }

        Ok(HubConfig {
            port: self.port,
            baud_rate: self.baud_rate,
            layout,
            read_buffer_size: self.read_buffer_size,
            data_buffer_size: self.data_buffer_size,
            delay_after_read: self.delay_after_read,
            read_timeout: self.read_timeout,
            output_queue_depth: self.output_queue_depth,
        })
    }
}
