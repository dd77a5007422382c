//! Link driver: one reader task that owns the ring buffer and scanner and also
//! services outbound commands, plus one decode task that unstuffs completed
//! frames. Tasks talk over bounded queues and stop cooperatively.
//!
//! The reader never blocks on an output queue. A frame the decode task cannot
//! take yet is parked and the remaining bytes stay in the ring buffer, so a
//! stalled consumer ends in `RingOverflow` rather than a stuck reader.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use serialhub_frame::{
    FrameError, FrameLayout, FrameScanner, FrameWriter, RingBuffer, ScanEvent, WriteOutcome,
};
use serialhub_transport::{is_timeout, Connector, SerialConnector, SerialLink};
use tracing::{debug, error, info, warn};

use crate::config::HubConfig;
use crate::error::{LinkError, Result};
use crate::events::{LinkWarning, WarningSink};
use crate::stop::StopSignal;

type SharedLink<L> = Arc<Mutex<Option<L>>>;

/// Pause between delivery attempts while the data queue is full.
const DELIVERY_RETRY: Duration = Duration::from_millis(2);

/// Owns the transport handle and runs the link tasks.
pub struct LinkDriver<C: Connector = SerialConnector> {
    config: HubConfig,
    connector: C,
    link: SharedLink<C::Link>,
    running: Arc<AtomicBool>,
    dropped_warnings: Arc<AtomicU64>,
}

impl LinkDriver<SerialConnector> {
    /// Driver over a real serial port.
    pub fn new(config: HubConfig) -> Self {
        let connector = SerialConnector::with_read_timeout(config.read_timeout());
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> LinkDriver<C> {
    pub fn with_connector(config: HubConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            link: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            dropped_warnings: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.link).is_some()
    }

    /// True while the reader task is alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Warnings discarded because the warning queue was full.
    pub fn dropped_warnings(&self) -> u64 {
        self.dropped_warnings.load(Ordering::Relaxed)
    }

    /// Open the transport, optionally discarding stale input and output.
    pub fn connect(&self, flush_input: bool, flush_output: bool) -> Result<()> {
        let mut slot = lock(&self.link);
        if slot.is_some() {
            return Err(LinkError::AlreadyConnected);
        }

        let mut link = self
            .connector
            .open(self.config.port(), self.config.baud_rate())?;
        link.set_read_timeout(self.config.read_timeout())?;
        if flush_input {
            link.reset_input_buffer()?;
        }
        if flush_output {
            link.reset_output_buffer()?;
        }

        info!(
            port = self.config.port(),
            baud_rate = self.config.baud_rate(),
            "link connected"
        );
        *slot = Some(link);
        Ok(())
    }

    /// Close the transport.
    pub fn disconnect(&self) -> Result<()> {
        match lock(&self.link).take() {
            Some(link) => {
                info!(port = link.port_name(), "link disconnected");
                Ok(())
            }
            None => Err(LinkError::NotConnected),
        }
    }

    /// Start the reader and decode tasks on the connected transport.
    ///
    /// Unstuffed messages go to `data_out`, connection-terminating errors to
    /// `err_out` (at most once), recoverable anomalies to `warn_out`. Every
    /// byte sequence received on `commands` is written verbatim.
    ///
    /// A full `data_out` holds back frame delivery while reading goes on
    /// until the ring buffer overflows. A full `warn_out` drops the warning
    /// (see [`dropped_warnings`](Self::dropped_warnings)). Dropping a receiver
    /// discards that output.
    pub fn start(
        &self,
        data_out: SyncSender<Bytes>,
        commands: Receiver<Bytes>,
        stop: StopSignal,
        err_out: SyncSender<LinkError>,
        warn_out: SyncSender<LinkWarning>,
    ) -> Result<DriverHandle> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(LinkError::AlreadyRunning);
        }

        let (raw_tx, raw_rx) = mpsc::sync_channel(self.config.output_queue_depth());
        let warnings = WarningSink::new(warn_out, Arc::clone(&self.dropped_warnings));

        // The decoder goes first: if the reader then fails to spawn, its
        // queue end is dropped with it and the decoder winds down on its own.
        let decode = DecodeTask {
            layout: self.config.layout(),
            raw_in: raw_rx,
            data_out,
            warnings: warnings.clone(),
            stop: stop.clone(),
        };
        let decoder = thread::Builder::new()
            .name("serialhub-decode".to_string())
            .spawn(move || decode.run())
            .map_err(|source| {
                self.running.store(false, Ordering::SeqCst);
                LinkError::Spawn {
                    name: "decode",
                    source,
                }
            })?;

        let reader = ReaderTask {
            link: Arc::clone(&self.link),
            layout: self.config.layout(),
            ring: RingBuffer::new(self.config.data_buffer_size()),
            scanner: FrameScanner::new(self.config.layout()),
            read_buffer: vec![0u8; self.config.read_buffer_size()].into_boxed_slice(),
            delay_after_read: self.config.delay_after_read(),
            commands,
            raw_out: raw_tx,
            parked: None,
            err_out,
            warnings,
            stop,
        };
        let running = Arc::clone(&self.running);
        let reader = thread::Builder::new()
            .name("serialhub-reader".to_string())
            .spawn(move || {
                reader.run();
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|source| {
                self.running.store(false, Ordering::SeqCst);
                LinkError::Spawn {
                    name: "reader",
                    source,
                }
            })?;

        debug!(port = self.config.port(), "link tasks started");
        Ok(DriverHandle { reader, decoder })
    }

    /// Create the queues, start the tasks and hand back the caller's ends.
    pub fn spawn(&self, stop: StopSignal) -> Result<LinkSession> {
        let depth = self.config.output_queue_depth();
        let (data_tx, data) = mpsc::sync_channel(depth);
        let (command_tx, command_rx) = mpsc::sync_channel(depth);
        let (err_tx, errors) = mpsc::sync_channel(1);
        let (warn_tx, warnings) = mpsc::sync_channel(depth);

        let handle = self.start(data_tx, command_rx, stop.clone(), err_tx, warn_tx)?;
        Ok(LinkSession {
            data,
            commands: command_tx,
            errors,
            warnings,
            stop,
            handle,
        })
    }
}

/// Join handles for the running link tasks.
#[derive(Debug)]
pub struct DriverHandle {
    reader: JoinHandle<()>,
    decoder: JoinHandle<()>,
}

impl DriverHandle {
    /// True once both tasks have exited.
    pub fn is_finished(&self) -> bool {
        self.reader.is_finished() && self.decoder.is_finished()
    }

    /// Wait for both tasks to exit.
    pub fn join(self) {
        if self.reader.join().is_err() {
            error!("reader task panicked");
        }
        if self.decoder.join().is_err() {
            error!("decode task panicked");
        }
    }
}

/// Caller side of a running link.
#[derive(Debug)]
pub struct LinkSession {
    pub data: Receiver<Bytes>,
    pub commands: SyncSender<Bytes>,
    pub errors: Receiver<LinkError>,
    pub warnings: Receiver<LinkWarning>,
    pub stop: StopSignal,
    pub handle: DriverHandle,
}

impl LinkSession {
    /// Signal stop and wait for the tasks.
    pub fn shutdown(self) {
        self.stop.stop();
        drop(self.commands);
        drop(self.data);
        drop(self.warnings);
        self.handle.join();
    }
}

struct ReaderTask<L> {
    link: SharedLink<L>,
    layout: FrameLayout,
    ring: RingBuffer<u8>,
    scanner: FrameScanner,
    read_buffer: Box<[u8]>,
    delay_after_read: Duration,
    commands: Receiver<Bytes>,
    raw_out: SyncSender<Bytes>,
    /// Frame scanned but not yet accepted by the decode task.
    parked: Option<Bytes>,
    err_out: SyncSender<LinkError>,
    warnings: WarningSink,
    stop: StopSignal,
}

impl<L: SerialLink> ReaderTask<L> {
    fn run(mut self) {
        loop {
            if self.stop.is_stopped() {
                debug!("stop requested, reader exiting");
                return;
            }

            let shared = Arc::clone(&self.link);
            let read = {
                let mut slot = lock(&shared);
                let Some(link) = slot.as_mut() else {
                    debug!("link closed, reader exiting");
                    return;
                };

                if let Err(err) = self.write_commands(link) {
                    self.fail(&mut slot, err);
                    return;
                }

                match link.read(&mut self.read_buffer) {
                    Ok(n) => n,
                    Err(err) if is_timeout(&err) => 0,
                    Err(err) => {
                        self.fail(&mut slot, LinkError::Read(err));
                        return;
                    }
                }
            };

            if !self.delay_after_read.is_zero() {
                thread::sleep(self.delay_after_read);
            }

            if read > self.ring.remaining() {
                let capacity = self.ring.capacity();
                self.fail(&mut lock(&self.link), LinkError::RingOverflow { capacity });
                return;
            }
            for &byte in &self.read_buffer[..read] {
                if self.ring.enqueue(byte).is_err() {
                    break;
                }
            }

            if !self.scan() {
                debug!("decode task gone, reader exiting");
                return;
            }
        }
    }

    /// Drain pending commands onto the transport.
    fn write_commands(&self, link: &mut L) -> Result<()> {
        let mut writer = FrameWriter::new(link, self.layout);
        loop {
            let command = match self.commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return Ok(()),
            };

            match writer.write_encoded(&command) {
                Ok(WriteOutcome::Complete) => {
                    debug!(len = command.len(), "command written");
                }
                Ok(WriteOutcome::Partial { written, expected }) => {
                    warn!(written, expected, "partial command write");
                    self.warnings
                        .report(LinkWarning::PartialWrite { written, expected });
                }
                Err(FrameError::Io(err)) => return Err(LinkError::Write(err)),
                Err(FrameError::ConnectionClosed) => {
                    return Err(LinkError::Write(ErrorKind::WriteZero.into()))
                }
                Err(err) => return Err(LinkError::Frame(err)),
            }
        }
    }

    /// Run the scanner over buffered bytes, pausing at the first frame the
    /// decode task cannot take. False when frames can no longer be delivered.
    fn scan(&mut self) -> bool {
        if let Some(frame) = self.parked.take() {
            if !self.hand_off(frame) {
                return false;
            }
        }
        if self.parked.is_some() || !self.scanner.ready(self.ring.len()) {
            return true;
        }

        while self.parked.is_none() {
            let Ok(byte) = self.ring.dequeue() else {
                break;
            };
            match self.scanner.push(byte) {
                Some(ScanEvent::Frame(frame)) => {
                    if !self.hand_off(frame) {
                        return false;
                    }
                }
                Some(ScanEvent::Warning(warning)) => {
                    self.warnings.report(LinkWarning::Scan(warning));
                }
                None => {}
            }
        }
        true
    }

    /// Pass a frame to the decode task, parking it when the queue is full.
    fn hand_off(&mut self, frame: Bytes) -> bool {
        match self.raw_out.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                debug!(buffered = self.ring.len(), "decode queue full, holding frame");
                self.parked = Some(frame);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Close the transport and report `err` once.
    fn fail(&self, slot: &mut MutexGuard<'_, Option<L>>, err: LinkError) {
        error!(error = %err, "link failed, closing transport");
        slot.take();
        let _ = self.err_out.send(err);
    }
}

struct DecodeTask {
    layout: FrameLayout,
    raw_in: Receiver<Bytes>,
    data_out: SyncSender<Bytes>,
    warnings: WarningSink,
    stop: StopSignal,
}

impl DecodeTask {
    fn run(self) {
        for frame in &self.raw_in {
            match self.layout.decode_message(&frame) {
                Ok(message) => {
                    if !self.deliver(message) {
                        return;
                    }
                }
                Err(err) => {
                    if matches!(err, FrameError::SizeMismatch { .. }) {
                        error!(error = %err, "unstuffed frame has unexpected size");
                    } else {
                        warn!(error = %err, "dropping undecodable frame");
                    }
                    self.warnings.report(LinkWarning::Decode(err));
                }
            }
        }
        debug!("raw frame queue closed, decode task exiting");
    }

    /// Wait for room on the data queue. False once stopped or the receiver
    /// is gone.
    fn deliver(&self, mut message: Bytes) -> bool {
        loop {
            match self.data_out.try_send(message) {
                Ok(()) => return true,
                Err(TrySendError::Full(pending)) => {
                    if self.stop.is_stopped() {
                        debug!("stop requested with data queue full, decode task exiting");
                        return false;
                    }
                    message = pending;
                    thread::sleep(DELIVERY_RETRY);
                }
                Err(TrySendError::Disconnected(_)) => {
                    debug!("data receiver dropped, decode task exiting");
                    return false;
                }
            }
        }
    }
}

fn lock<L>(link: &Mutex<Option<L>>) -> MutexGuard<'_, Option<L>> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}
