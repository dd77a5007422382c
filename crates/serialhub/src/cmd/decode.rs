use serialhub_frame::FrameLayout;

use crate::cmd::records::RecordDecoder;
use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::hex;
use crate::output::OutputFormat;

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let layout = args.frame.layout()?;
    let input = hex::decode(&args.frame_hex)?;
    let message = unstuff(&layout, input, args.unstuffed)?;

    let mut decoder = RecordDecoder::from_args(&args.schema)?;
    let hash_valid = decoder.render(&message, format)?;

    if args.verify && !hash_valid {
        return Err(CliError::new(DATA_INVALID, "checksum mismatch"));
    }
    Ok(SUCCESS)
}

fn unstuff(layout: &FrameLayout, input: Vec<u8>, already_unstuffed: bool) -> CliResult<Vec<u8>> {
    if already_unstuffed {
        if input.len() != layout.message_size() {
            return Err(CliError::new(
                DATA_INVALID,
                format!(
                    "message is {} bytes, expected {}",
                    input.len(),
                    layout.message_size()
                ),
            ));
        }
        return Ok(input);
    }
    layout
        .decode_message(&input)
        .map(|message| message.to_vec())
        .map_err(|err| frame_error("unstuffing failed", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstuff_round_trips_encoded_command() {
        let layout = FrameLayout::new(12, 0xCF).unwrap();
        let frame = layout.encode_command(b"\x01\x02").unwrap();

        let message = unstuff(&layout, frame.to_vec(), false).unwrap();
        assert_eq!(message.len(), 12);
        assert_eq!(&message[..3], &[1, 2, 0]);
    }

    #[test]
    fn unstuffed_input_must_match_message_size() {
        let layout = FrameLayout::new(12, 0xCF).unwrap();
        assert!(unstuff(&layout, vec![0; 12], true).is_ok());
        assert_eq!(
            unstuff(&layout, vec![0; 11], true).unwrap_err().code,
            DATA_INVALID
        );
    }

    #[test]
    fn wrong_layout_is_data_invalid() {
        let encoded = FrameLayout::new(12, 0xCF)
            .unwrap()
            .encode_command(b"x")
            .unwrap();
        let other = FrameLayout::new(16, 0xCF).unwrap();
        assert_eq!(
            unstuff(&other, encoded.to_vec(), false).unwrap_err().code,
            DATA_INVALID
        );
    }
}
