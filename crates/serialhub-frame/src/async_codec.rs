//! `tokio-util` codec over the same scanner state machine.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::FrameLayout;
use crate::error::FrameError;
use crate::scanner::{FrameScanner, ScanEvent};

/// Decodes stuffed frames and warnings, encodes command payloads.
///
/// Partial frames live in the scanner, so `src` is always consumed up to the
/// byte that produced the returned event.
#[derive(Debug)]
pub struct MessageCodec {
    scanner: FrameScanner,
}

impl MessageCodec {
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            scanner: FrameScanner::new(layout),
        }
    }

    pub fn layout(&self) -> FrameLayout {
        self.scanner.layout()
    }
}

impl Decoder for MessageCodec {
    type Item = ScanEvent;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(event) = self.scanner.push(byte) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}

impl<'a> Encoder<&'a [u8]> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.scanner.layout().encode_command_into(item, dst)
    }
}
