use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::Bytes;

use crate::codec::FrameLayout;
use crate::error::{FrameError, Result};
use crate::ring::RingBuffer;
use crate::scanner::{FrameScanner, ScanEvent};

/// Bytes requested from the stream per read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Ring buffer capacity between the stream and the scanner.
pub const DEFAULT_DATA_BUFFER_SIZE: usize = 65535;

/// Pulls stuffed frames out of any `Read` stream.
///
/// Bytes are read in chunks into a ring buffer and run through a
/// [`FrameScanner`]. Partial reads are handled internally.
pub struct FrameReader<T> {
    inner: T,
    ring: RingBuffer<u8>,
    scanner: FrameScanner,
    pending: VecDeque<ScanEvent>,
    chunk: Box<[u8]>,
}

impl<T: Read> FrameReader<T> {
    /// Create a reader with default buffer sizes.
    pub fn new(inner: T, layout: FrameLayout) -> Self {
        Self::with_buffers(
            inner,
            layout,
            DEFAULT_READ_BUFFER_SIZE,
            DEFAULT_DATA_BUFFER_SIZE,
        )
    }

    /// Create a reader with explicit chunk and ring sizes.
    ///
    /// Sizes are raised so that one chunk and one packet always fit.
    pub fn with_buffers(
        inner: T,
        layout: FrameLayout,
        read_buffer_size: usize,
        data_buffer_size: usize,
    ) -> Self {
        let read_buffer_size = read_buffer_size.max(1);
        let data_buffer_size = data_buffer_size
            .max(read_buffer_size)
            .max(layout.packet_size());
        Self {
            inner,
            ring: RingBuffer::new(data_buffer_size),
            scanner: FrameScanner::new(layout),
            pending: VecDeque::new(),
            chunk: vec![0u8; read_buffer_size].into_boxed_slice(),
        }
    }

    /// Next scanner event (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at EOF. A partial frame
    /// held at that point is dropped.
    pub fn next_event(&mut self) -> Result<ScanEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }

            let room = self.ring.remaining().min(self.chunk.len());
            if room == 0 {
                return Err(FrameError::BufferFull {
                    capacity: self.ring.capacity(),
                });
            }

            let read = match self.inner.read(&mut self.chunk[..room]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            for &byte in &self.chunk[..read] {
                self.ring.enqueue(byte)?;
            }

            let pending = &mut self.pending;
            self.scanner.scan(&mut self.ring, |event| pending.push_back(event));
        }
    }

    /// Next stuffed frame, skipping warnings.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let ScanEvent::Frame(frame) = self.next_event()? {
                return Ok(frame);
            }
        }
    }

    /// Next frame unstuffed to exactly `message_size` bytes.
    pub fn read_message(&mut self) -> Result<Bytes> {
        let frame = self.read_frame()?;
        self.scanner.layout().decode_message(&frame)
    }

    /// Frame geometry in use.
    pub fn layout(&self) -> FrameLayout {
        self.scanner.layout()
    }

    /// Bytes buffered but not yet scanned.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
