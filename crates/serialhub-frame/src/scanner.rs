//! Frame boundary detection over an unstructured byte stream.
//!
//! The scanner collects stuffed bytes into a fixed parse buffer of
//! `packet_size` bytes and expects the delimiter exactly when that buffer is
//! full. Anything else drops the partial frame, reports a warning, and scanning
//! resumes with the next byte. There is no backtracking.

use bytes::Bytes;
use tracing::{trace, warn};

use crate::codec::FrameLayout;
use crate::ring::RingBuffer;

/// Recoverable framing anomaly. The partial frame has already been dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanWarning {
    /// Delimiter seen before the parse buffer was full.
    #[error("delimiter found after {read_count} bytes, expected {expected}")]
    DelimiterMismatch {
        read_count: usize,
        expected: usize,
        partial: Bytes,
    },

    /// Parse buffer full but the next byte was not the delimiter.
    #[error("delimiter missing after {read_count} bytes")]
    DelimiterMissing { read_count: usize, partial: Bytes },

    /// Parse position ran past the packet size.
    #[error("parse buffer overrun at {read_count} bytes")]
    BufferOverrun { read_count: usize },
}

/// Output of one scanner step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A complete stuffed frame, delimiter excluded.
    Frame(Bytes),
    /// A dropped partial frame.
    Warning(ScanWarning),
}

/// Byte-at-a-time framing state machine.
#[derive(Debug)]
pub struct FrameScanner {
    layout: FrameLayout,
    parse_buffer: Box<[u8]>,
    read_count: usize,
}

impl FrameScanner {
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            parse_buffer: vec![0u8; layout.packet_size()].into_boxed_slice(),
            layout,
            read_count: 0,
        }
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Bytes collected for the frame in progress.
    pub fn read_count(&self) -> usize {
        self.read_count
    }

    /// True when no partial frame is held.
    pub fn is_idle(&self) -> bool {
        self.read_count == 0
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.read_count = 0;
    }

    /// Whether a full packet could be present given `buffered` pending bytes.
    pub fn ready(&self, buffered: usize) -> bool {
        buffered > 0 && self.read_count + buffered >= self.layout.packet_size()
    }

    /// Feed one byte.
    pub fn push(&mut self, byte: u8) -> Option<ScanEvent> {
        let packet_size = self.layout.packet_size();

        let event = if byte == self.layout.delimiter() {
            if self.read_count == packet_size {
                let frame = Bytes::copy_from_slice(&self.parse_buffer);
                trace!(len = frame.len(), "frame complete");
                self.read_count = 0;
                Some(ScanEvent::Frame(frame))
            } else {
                let partial = self.take_partial();
                warn!(
                    read_count = partial.len(),
                    expected = packet_size,
                    "delimiter found at unexpected position"
                );
                Some(ScanEvent::Warning(ScanWarning::DelimiterMismatch {
                    read_count: partial.len(),
                    expected: packet_size,
                    partial,
                }))
            }
        } else if self.read_count == packet_size {
            let partial = self.take_partial();
            warn!(read_count = partial.len(), "delimiter not found");
            Some(ScanEvent::Warning(ScanWarning::DelimiterMissing {
                read_count: partial.len(),
                partial,
            }))
        } else {
            self.parse_buffer[self.read_count] = byte;
            self.read_count += 1;
            None
        };

        if self.read_count > packet_size {
            let read_count = self.read_count;
            warn!(read_count, "parse buffer overrun");
            self.read_count = 0;
            return Some(ScanEvent::Warning(ScanWarning::BufferOverrun {
                read_count,
            }));
        }

        event
    }

    /// Drain `ring` through the state machine, reporting each event.
    ///
    /// Does nothing unless [`ready`](Self::ready) holds for the ring's current
    /// size. Returns the number of bytes consumed.
    pub fn scan<F>(&mut self, ring: &mut RingBuffer<u8>, mut on_event: F) -> usize
    where
        F: FnMut(ScanEvent),
    {
        if !self.ready(ring.len()) {
            return 0;
        }

        let packet_size = self.layout.packet_size();
        let mut consumed = 0;
        while !ring.is_empty() && self.read_count <= packet_size {
            let Ok(byte) = ring.dequeue() else {
                break;
            };
            consumed += 1;
            if let Some(event) = self.push(byte) {
                on_event(event);
            }
        }
        consumed
    }

    fn take_partial(&mut self) -> Bytes {
        let partial = Bytes::copy_from_slice(&self.parse_buffer[..self.read_count]);
        self.read_count = 0;
        partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIM: u8 = 0xCF;

    fn scanner(message_size: usize) -> FrameScanner {
        FrameScanner::new(FrameLayout::new(message_size, DELIM).unwrap())
    }

    fn feed(scanner: &mut FrameScanner, bytes: &[u8]) -> Vec<ScanEvent> {
        bytes.iter().filter_map(|&b| scanner.push(b)).collect()
    }

    fn ring_with(bytes: &[u8]) -> RingBuffer<u8> {
        let mut ring = RingBuffer::new(256);
        for &b in bytes {
            ring.enqueue(b).unwrap();
        }
        ring
    }

    #[test]
    fn full_packet_then_delimiter_emits_one_frame() {
        let mut s = scanner(5);
        let packet = [1, 2, 3, 4, 5, 6];
        let mut input = packet.to_vec();
        input.push(DELIM);

        let events = feed(&mut s, &input);
        assert_eq!(events, vec![ScanEvent::Frame(Bytes::copy_from_slice(&packet))]);
        assert!(s.is_idle());
    }

    #[test]
    fn early_delimiter_warns_and_resumes() {
        let mut s = scanner(5);
        let events = feed(&mut s, &[1, 2, 3, DELIM]);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ScanEvent::Warning(ScanWarning::DelimiterMismatch {
                read_count,
                expected,
                partial,
            }) => {
                assert_eq!(*read_count, 3);
                assert_eq!(*expected, 6);
                assert_eq!(partial.as_ref(), &[1, 2, 3]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(s.is_idle());

        let events = feed(&mut s, &[9, 8, 7, 6, 5, 4, DELIM]);
        assert_eq!(
            events,
            vec![ScanEvent::Frame(Bytes::from_static(&[9, 8, 7, 6, 5, 4]))]
        );
    }

    #[test]
    fn missing_delimiter_drops_buffer_and_byte() {
        let mut s = scanner(5);
        let events = feed(&mut s, &[1, 2, 3, 4, 5, 6, 0x77]);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ScanEvent::Warning(ScanWarning::DelimiterMissing { read_count: 6, .. })
        ));
        // the byte that tripped the warning is not kept
        assert!(s.is_idle());

        let events = feed(&mut s, &[1, 1, 1, 1, 1, 1, DELIM]);
        assert!(matches!(&events[..], [ScanEvent::Frame(_)]));
    }

    #[test]
    fn leading_delimiter_on_idle_is_mismatch() {
        let mut s = scanner(5);
        let events = feed(&mut s, &[DELIM]);
        assert!(matches!(
            &events[..],
            [ScanEvent::Warning(ScanWarning::DelimiterMismatch { read_count: 0, .. })]
        ));
    }

    #[test]
    fn scan_waits_for_a_packet_worth_of_bytes() {
        let mut s = scanner(5);
        let mut ring = ring_with(&[1, 2, 3]);
        let mut events = Vec::new();

        assert_eq!(s.scan(&mut ring, |e| events.push(e)), 0);
        assert_eq!(ring.len(), 3);
        assert!(events.is_empty());

        for b in [4, 5, 6, DELIM] {
            ring.enqueue(b).unwrap();
        }
        assert_eq!(s.scan(&mut ring, |e| events.push(e)), 7);
        assert!(ring.is_empty());
        assert_eq!(
            events,
            vec![ScanEvent::Frame(Bytes::from_static(&[1, 2, 3, 4, 5, 6]))]
        );
    }

    #[test]
    fn scan_counts_partial_frame_towards_gate() {
        let mut s = scanner(5);
        let mut ring = ring_with(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut events = Vec::new();
        s.scan(&mut ring, |e| events.push(e));
        // 6 collected, 7 missing-delimiter, 8 starts a new frame
        assert_eq!(s.read_count(), 1);
        assert_eq!(events.len(), 1);

        // one buffered plus five pending reaches the packet size
        let mut ring = ring_with(&[9, 9, 9, 9, 9]);
        assert!(s.ready(ring.len()));
        s.scan(&mut ring, |e| events.push(e));
        assert_eq!(s.read_count(), 6);
    }

    #[test]
    fn frames_delivered_in_delimiter_order() {
        let mut s = scanner(5);
        let mut input = Vec::new();
        for n in 1u8..=3 {
            input.extend_from_slice(&[n; 6]);
            input.push(DELIM);
        }
        let mut ring = ring_with(&input);

        let mut frames = Vec::new();
        s.scan(&mut ring, |e| {
            if let ScanEvent::Frame(f) = e {
                frames.push(f[0]);
            }
        });
        assert_eq!(frames, vec![1, 2, 3]);
    }

    #[test]
    fn garbage_before_frame_resynchronizes() {
        let mut s = scanner(5);
        let mut input = vec![0x10, 0x20, DELIM];
        input.extend_from_slice(&[1, 2, 3, 4, 5, 6, DELIM]);
        let events = feed(&mut s, &input);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ScanEvent::Warning(_)));
        assert_eq!(
            events[1],
            ScanEvent::Frame(Bytes::from_static(&[1, 2, 3, 4, 5, 6]))
        );
    }

    #[test]
    fn warning_messages_render() {
        let w = ScanWarning::DelimiterMismatch {
            read_count: 3,
            expected: 57,
            partial: Bytes::new(),
        };
        assert_eq!(w.to_string(), "delimiter found after 3 bytes, expected 57");
    }
}
