use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let layout = args.frame.layout()?;
    let payload = args.payload.resolve()?;
    let frame = layout
        .encode_command(&payload)
        .map_err(|err| frame_error("encode failed", err))?;

    tracing::debug!(
        payload = payload.len(),
        frame = frame.len(),
        delimiter = layout.delimiter(),
        "encoded command"
    );
    print_encoded(&payload, &frame, format);
    Ok(SUCCESS)
}
