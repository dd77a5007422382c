use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;

use serialhub_frame::{FrameError, ScanWarning};
use tracing::warn;

/// Recoverable anomaly reported on the warning queue. Processing continues.
#[derive(Debug, thiserror::Error)]
pub enum LinkWarning {
    /// The scanner dropped a partial frame.
    #[error("framing: {0}")]
    Scan(#[from] ScanWarning),

    /// A command was only partly accepted by the transport.
    #[error("partial command write ({written} of {expected} bytes)")]
    PartialWrite { written: usize, expected: usize },

    /// A scanned frame failed to unstuff or had the wrong size.
    #[error("frame decode: {0}")]
    Decode(#[source] FrameError),
}

impl LinkWarning {
    /// True for a post-unstuffing size mismatch, which points at a framing
    /// disagreement rather than line noise.
    pub fn is_size_mismatch(&self) -> bool {
        matches!(self, Self::Decode(FrameError::SizeMismatch { .. }))
    }
}

/// Non-blocking side of the warning queue.
///
/// A full queue drops the warning and bumps the shared counter; a dropped
/// receiver discards silently. Link tasks never wait on warnings.
#[derive(Debug, Clone)]
pub(crate) struct WarningSink {
    tx: SyncSender<LinkWarning>,
    dropped: Arc<AtomicU64>,
}

impl WarningSink {
    pub(crate) fn new(tx: SyncSender<LinkWarning>, dropped: Arc<AtomicU64>) -> Self {
        Self { tx, dropped }
    }

    pub(crate) fn report(&self, warning: LinkWarning) {
        match self.tx.try_send(warning) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(warning)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(%warning, dropped, "warning queue full, dropping warning");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use bytes::Bytes;

    use super::*;

    #[test]
    fn messages_render() {
        let w = LinkWarning::PartialWrite {
            written: 3,
            expected: 58,
        };
        assert_eq!(w.to_string(), "partial command write (3 of 58 bytes)");

        let w = LinkWarning::from(ScanWarning::DelimiterMissing {
            read_count: 57,
            partial: Bytes::new(),
        });
        assert_eq!(w.to_string(), "framing: delimiter missing after 57 bytes");
    }

    #[test]
    fn size_mismatch_classified() {
        let w = LinkWarning::Decode(FrameError::SizeMismatch {
            expected: 56,
            actual: 12,
        });
        assert!(w.is_size_mismatch());
        assert!(!LinkWarning::Decode(FrameError::EmptyInput).is_size_mismatch());
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let (tx, rx) = mpsc::sync_channel(1);
        let dropped = Arc::new(AtomicU64::new(0));
        let sink = WarningSink::new(tx, Arc::clone(&dropped));

        for _ in 0..3 {
            sink.report(LinkWarning::Decode(FrameError::EmptyInput));
        }
        assert_eq!(dropped.load(Ordering::Relaxed), 2);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        drop(rx);
        sink.report(LinkWarning::Decode(FrameError::EmptyInput));
        assert_eq!(dropped.load(Ordering::Relaxed), 2);
    }
}
