//! Serial link driver.
//!
//! [`LinkDriver`] owns one transport handle. Once started it runs a reader
//! task (transport reads, ring buffer, frame scanner, outbound commands) and a
//! decode task (unstuffing and size check), delivering messages, warnings and
//! fatal errors over bounded queues. Schema selection is left to the caller.

pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod stop;

pub use config::{
    ConfigError, HubConfig, HubConfigBuilder, DEFAULT_DELAY_AFTER_READ, DEFAULT_DELIMITER,
    DEFAULT_MESSAGE_SIZE, DEFAULT_OUTPUT_QUEUE_DEPTH, DEFAULT_READ_TIMEOUT,
};
pub use driver::{DriverHandle, LinkDriver, LinkSession};
pub use error::{LinkError, Result};
pub use events::LinkWarning;
pub use stop::StopSignal;
