use ardubridge::frame::{LinkConfig, ESCAPE, RESET};
use ardubridge::transport::DEFAULT_BAUD_RATE;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("ardubridge {}", env!("CARGO_PKG_VERSION"));
    if args.extended {
        for (key, value) in build_details() {
            println!("{key}: {value}");
        }
    }
    Ok(SUCCESS)
}

/// Build provenance plus the wire constants and link timings this binary
/// was compiled with, for matching a host build against board firmware.
fn build_details() -> Vec<(&'static str, String)> {
    let link = LinkConfig::default();
    vec![
        (
            "target",
            option_env!("ARDUBRIDGE_BUILD_TARGET")
                .unwrap_or("unknown")
                .to_string(),
        ),
        (
            "profile",
            option_env!("ARDUBRIDGE_BUILD_PROFILE")
                .unwrap_or("unknown")
                .to_string(),
        ),
        ("reset_byte", format!("{RESET:#04x}")),
        ("escape_byte", format!("{ESCAPE:#04x}")),
        ("baud_rate", DEFAULT_BAUD_RATE.to_string()),
        (
            "byte_wait",
            format!("{:?} x {}", link.byte_timeout, link.byte_attempts),
        ),
        ("escape_timeout", format!("{:?}", link.escape_timeout)),
        ("reconnect_backoff", format!("{:?}", link.reconnect_backoff)),
    ]
}
