use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use serialhub_link::{HubConfig, LinkDriver, LinkError, LinkSession, StopSignal};

use crate::cmd::records::RecordDecoder;
use crate::cmd::MonitorArgs;
use crate::exit::{link_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

/// How long to wait on the data queue before checking for stop and errors.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let config = HubConfig::builder(args.port.port.clone(), args.port.baud)
        .message_size(args.frame.message_size)
        .message_delimiter(args.frame.delimiter)
        .read_buffer_size(args.read_buffer_size)
        .data_buffer_size(args.data_buffer_size)
        .delay_after_read(args.delay_after_read)
        .read_timeout(args.port.read_timeout)
        .output_queue_depth(args.queue_depth)
        .build()
        .map_err(|err| link_error("invalid configuration", LinkError::Config(err)))?;
    let mut decoder = RecordDecoder::from_args(&args.schema)?;

    let stop = StopSignal::new();
    install_ctrlc_handler(stop.clone())?;

    let driver = LinkDriver::new(config);
    let flush = !args.no_flush;
    driver
        .connect(flush, flush)
        .map_err(|err| link_error("connect failed", err))?;
    let session = match driver.spawn(stop) {
        Ok(session) => session,
        Err(err) => {
            let _ = driver.disconnect();
            return Err(link_error("start failed", err));
        }
    };

    let outcome = pump(&session, &mut decoder, args.count, format);
    session.shutdown();
    let dropped = driver.dropped_warnings();
    if dropped > 0 {
        tracing::warn!(dropped, "warnings dropped while the warning queue was full");
    }
    match driver.disconnect() {
        Ok(()) | Err(LinkError::NotConnected) => {}
        Err(err) => tracing::warn!(error = %err, "disconnect failed"),
    }
    outcome
}

/// Print messages until stopped, `count` is reached or the link fails.
fn pump(
    session: &LinkSession,
    decoder: &mut RecordDecoder,
    count: Option<usize>,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut printed = 0usize;

    loop {
        drain_warnings(session);

        if let Ok(err) = session.errors.try_recv() {
            return Err(link_error("link failed", err));
        }
        if session.stop.is_stopped() {
            tracing::info!(printed, "stopping");
            return Ok(SUCCESS);
        }

        let message = match session.data.recv_timeout(POLL_INTERVAL) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                drain_warnings(session);
                return match session.errors.try_recv() {
                    Ok(err) => Err(link_error("link failed", err)),
                    Err(_) => Ok(SUCCESS),
                };
            }
        };

        match decoder.render(&message, format) {
            Ok(true) => {}
            Ok(false) => tracing::warn!(size = message.len(), "checksum mismatch"),
            Err(err) => {
                tracing::warn!(error = %err, "skipping message");
                continue;
            }
        }

        printed = printed.saturating_add(1);
        if count.is_some_and(|limit| printed >= limit) {
            return Ok(SUCCESS);
        }
    }
}

fn drain_warnings(session: &LinkSession) {
    while let Ok(warning) = session.warnings.try_recv() {
        if warning.is_size_mismatch() {
            tracing::error!(%warning, "link warning");
        } else {
            tracing::warn!(%warning, "link warning");
        }
    }
}

fn install_ctrlc_handler(stop: StopSignal) -> CliResult<()> {
    ctrlc::set_handler(move || stop.stop()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
