use std::fmt;
use std::io;

use ardubridge_channel::ChannelError;
use ardubridge_periph::PeriphError;
use ardubridge_transport::TransportError;

// Exit codes follow sysexits-style semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::DeviceUnavailable(err) => transport_error(context, err),
        ChannelError::Io(source) => io_error(context, source),
        ChannelError::Timeout | ChannelError::Identify { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ChannelError::InvalidCommand(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ChannelError::Closed
        | ChannelError::UnexpectedReset
        | ChannelError::IncompleteEscape
        | ChannelError::MalformedEscape(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn periph_error(context: &str, err: PeriphError) -> CliError {
    match err {
        PeriphError::Channel(err) => channel_error(context, err),
        PeriphError::InvalidArgument(_) => CliError::new(USAGE, format!("{context}: {err}")),
        PeriphError::I2c { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_map_to_124() {
        assert_eq!(channel_error("x", ChannelError::Timeout).code, TIMEOUT);
        assert_eq!(
            channel_error("x", ChannelError::Identify { attempts: 7 }).code,
            TIMEOUT
        );
        let err = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(channel_error("x", ChannelError::Io(err)).code, TIMEOUT);
    }

    #[test]
    fn missing_port_maps_to_transport() {
        let err = TransportError::Open {
            path: "/dev/ttyACM9".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let cli = channel_error("open failed", ChannelError::DeviceUnavailable(err));
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.contains("/dev/ttyACM9"));
    }

    #[test]
    fn bad_arguments_map_to_usage() {
        let err = PeriphError::InvalidArgument("pin".to_string());
        assert_eq!(periph_error("x", err).code, USAGE);
        let err = ChannelError::InvalidCommand("short".to_string());
        assert_eq!(periph_error("x", err.into()).code, USAGE);
    }

    #[test]
    fn desync_maps_to_failure() {
        assert_eq!(
            channel_error("x", ChannelError::UnexpectedReset).code,
            FAILURE
        );
    }
}
