use std::io::Read;
use std::time::{Duration, Instant};

use serialhub_frame::{FrameError, FrameReader, FrameWriter, WriteOutcome};
use serialhub_transport::{is_timeout, Connector, SerialConnector, SerialLink};

use crate::cmd::records::RecordDecoder;
use crate::cmd::SendArgs;
use crate::exit::{frame_error, transport_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::OutputFormat;

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let layout = args.frame.layout()?;
    let payload = args.payload.resolve()?;
    let frame = layout
        .encode_command(&payload)
        .map_err(|err| frame_error("encode failed", err))?;
    let mut decoder = if args.wait {
        Some(RecordDecoder::from_args(&args.schema)?)
    } else {
        None
    };

    let connector = SerialConnector::with_read_timeout(args.port.read_timeout);
    let mut link = connector
        .open(&args.port.port, args.port.baud)
        .map_err(|err| transport_error("open failed", err))?;
    link.reset_input_buffer()
        .map_err(|err| transport_error("flush failed", err))?;

    let mut writer = FrameWriter::new(link, layout);
    match writer
        .write_encoded(&frame)
        .map_err(|err| frame_error("send failed", err))?
    {
        WriteOutcome::Complete => {
            tracing::info!(port = %args.port.port, bytes = frame.len(), "command sent");
        }
        WriteOutcome::Partial { written, expected } => {
            return Err(CliError::new(
                FAILURE,
                format!("partial write: {written} of {expected} bytes"),
            ));
        }
    }

    if let Some(decoder) = decoder.as_mut() {
        let mut reader = FrameReader::new(writer.into_inner(), layout);
        let message = wait_for_message(&mut reader, args.wait_timeout)?;
        decoder.render(&message, format)?;
    }

    Ok(SUCCESS)
}

/// Read until one message arrives, treating read timeouts as idle polls.
fn wait_for_message<R: Read>(reader: &mut FrameReader<R>, timeout: Duration) -> CliResult<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    loop {
        match reader.read_message() {
            Ok(message) => return Ok(message.to_vec()),
            Err(FrameError::Io(err)) if is_timeout(&err) => {
                if Instant::now() >= deadline {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("no response within {}ms", timeout.as_millis()),
                    ));
                }
            }
            Err(err @ FrameError::SizeMismatch { .. }) => {
                tracing::warn!(error = %err, "discarding response");
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        }
    }
}
