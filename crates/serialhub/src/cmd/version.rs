use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("serialhub {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: serialhub");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SERIALHUB_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: link={}, schema={}, async={}, cli=true",
        cfg!(feature = "link"),
        cfg!(feature = "schema"),
        cfg!(feature = "async")
    );
    println!(
        "frame: max_message_size={}, min_message_size={}",
        serialhub_frame::MAX_MESSAGE_SIZE,
        serialhub_frame::MIN_MESSAGE_SIZE
    );

    Ok(SUCCESS)
}
