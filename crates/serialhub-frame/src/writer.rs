use std::io::{ErrorKind, Write};
use std::thread;
use std::time::Duration;

use bytes::BytesMut;

use crate::codec::FrameLayout;
use crate::error::{FrameError, Result};

/// Result of handing one encoded command to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Complete,
    /// The stream took fewer bytes than offered. The rest was not retried.
    Partial { written: usize, expected: usize },
}

impl WriteOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Writes command frames to any `Write` stream.
///
/// Each command goes out in a single `write` call. A short write is reported
/// as [`WriteOutcome::Partial`] so the caller can decide what to do with it.
pub struct FrameWriter<T> {
    inner: T,
    layout: FrameLayout,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T, layout: FrameLayout) -> Self {
        Self {
            inner,
            layout,
            buf: BytesMut::new(),
        }
    }

    /// Frame `payload` as a command and write it.
    pub fn send_command(&mut self, payload: &[u8]) -> Result<WriteOutcome> {
        self.buf.clear();
        self.layout.encode_command_into(payload, &mut self.buf)?;
        write_once(&mut self.inner, &self.buf)
    }

    /// Write an already encoded byte sequence verbatim.
    pub fn write_encoded(&mut self, encoded: &[u8]) -> Result<WriteOutcome> {
        write_once(&mut self.inner, encoded)
    }

    /// Frame geometry in use.
    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn write_once<T: Write>(inner: &mut T, bytes: &[u8]) -> Result<WriteOutcome> {
    if bytes.is_empty() {
        return Ok(WriteOutcome::Complete);
    }

    let written = loop {
        match inner.write(bytes) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => break n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    };

    flush(inner)?;

    if written < bytes.len() {
        return Ok(WriteOutcome::Partial {
            written,
            expected: bytes.len(),
        });
    }
    Ok(WriteOutcome::Complete)
}

/// `WouldBlock` flush attempts before the error is handed to the caller.
const FLUSH_ATTEMPTS: u32 = 5;

fn flush<T: Write>(inner: &mut T) -> Result<()> {
    let mut blocked = 0u32;
    loop {
        match inner.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock && blocked + 1 < FLUSH_ATTEMPTS => {
                blocked += 1;
                thread::sleep(Duration::from_millis(u64::from(blocked)));
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}
