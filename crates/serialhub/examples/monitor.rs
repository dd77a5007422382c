//! Print decoded records from a serial device until Ctrl-C.
//!
//! Run with:
//!   cargo run --example monitor --features link,schema -- /dev/ttyACM0 specs
//!
//! `specs` holds one `<version>.json` field schema per firmware version; the
//! version key is read from bytes 7..=8 of every message.

use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use serialhub::link::{HubConfig, LinkDriver, StopSignal};
use serialhub::schema::{DirectorySource, SchemaRegistry, VersionLocator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyACM0".to_string());
    let specs = args.next().unwrap_or_else(|| "specs".to_string());

    let config = HubConfig::builder(port, 460_800)
        .message_size(56)
        .message_delimiter(0xCF)
        .build()?;
    let mut registry = SchemaRegistry::new(DirectorySource::new(specs)?, VersionLocator::new(7, 8)?);

    let driver = LinkDriver::new(config);
    driver.connect(true, true)?;
    let session = driver.spawn(StopSignal::new())?;
    eprintln!("Monitoring {}", driver.config().port());

    loop {
        if let Ok(err) = session.errors.try_recv() {
            eprintln!("Link failed: {err}");
            break;
        }
        while let Ok(warning) = session.warnings.try_recv() {
            eprintln!("Warning: {warning}");
        }

        let message = match session.data.recv_timeout(Duration::from_millis(100)) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        match registry.decode_frame(&message) {
            Ok(decoded) => {
                let status = if decoded.record.is_hash_valid() {
                    "ok"
                } else {
                    "mismatch"
                };
                println!("version {} hash {status}", decoded.version);
                for (name, value) in &decoded.record {
                    println!("  {name} = {value}");
                }
            }
            Err(err) => eprintln!("Undecodable message: {err}"),
        }
    }

    session.shutdown();
    let _ = driver.disconnect();
    Ok(())
}
