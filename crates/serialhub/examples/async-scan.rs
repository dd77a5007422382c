//! Scan frames from an async byte stream with the tokio codec.
//!
//! Run with:
//!   cargo run --example async-scan --features async
//!
//! A duplex pipe stands in for the serial port: one half receives encoded
//! commands plus some line noise, the other half is read as a frame stream.

use futures_util::{SinkExt, StreamExt};
use serialhub::frame::{FrameLayout, MessageCodec, ScanEvent};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{FramedRead, FramedWrite};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let layout = FrameLayout::new(16, 0xCF)?;
    let (device, host) = tokio::io::duplex(256);
    let (device_rx, device_tx) = tokio::io::split(device);
    drop(device_rx);

    let writer = tokio::spawn(async move {
        let mut sink = FramedWrite::new(device_tx, MessageCodec::new(layout));
        sink.send(b"first".as_slice()).await?;
        sink.get_mut().write_all(&[0x11, 0x22, 0xCF]).await?;
        sink.send(b"second".as_slice()).await?;
        sink.get_mut().shutdown().await?;
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
    });

    let mut frames = FramedRead::new(host, MessageCodec::new(layout));
    while let Some(event) = frames.next().await {
        match event? {
            ScanEvent::Frame(frame) => {
                let message = layout.decode_message(&frame)?;
                let text: Vec<u8> = message.iter().copied().take_while(|b| *b != 0).collect();
                println!("message: {}", String::from_utf8_lossy(&text));
            }
            ScanEvent::Warning(warning) => println!("warning: {warning}"),
        }
    }

    writer.await?.map_err(|err| err.to_string())?;
    Ok(())
}
