use ardubridge_frame::LinkError;
use ardubridge_transport::TransportError;

/// Errors that can occur during a command exchange.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The serial device could not be opened.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(TransportError),

    /// The channel is closed.
    #[error("channel is closed")]
    Closed,

    /// The reply did not arrive in time.
    #[error("timed out waiting for reply")]
    Timeout,

    /// The board sent RESET mid-reply; it restarted or lost sync.
    #[error("board sent RESET mid-reply")]
    UnexpectedReset,

    /// An escape pair was cut short.
    #[error("incomplete escape sequence in reply")]
    IncompleteEscape,

    /// An escape pair decoded to a non-reserved value.
    #[error("malformed escape sequence in reply (0x5c 0x{0:02x})")]
    MalformedEscape(u8),

    /// Transport fault that outlasted the reconnect budget.
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// The request bytes do not match the command's layout.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The board never answered the identification query.
    #[error("no identification reply after {attempts} attempts")]
    Identify { attempts: u32 },
}

impl From<LinkError> for ChannelError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::DeviceUnavailable(source) => ChannelError::DeviceUnavailable(source),
            LinkError::Closed => ChannelError::Closed,
            LinkError::Timeout => ChannelError::Timeout,
            LinkError::UnexpectedReset => ChannelError::UnexpectedReset,
            LinkError::IncompleteEscape => ChannelError::IncompleteEscape,
            LinkError::MalformedEscape(byte) => ChannelError::MalformedEscape(byte),
            LinkError::Io(source) => ChannelError::Io(source),
        }
    }
}

impl ChannelError {
    /// True for failures that a [`crate::CommandChannel::reset`] followed by
    /// a retry is expected to clear.
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            ChannelError::Timeout
                | ChannelError::UnexpectedReset
                | ChannelError::IncompleteEscape
                | ChannelError::MalformedEscape(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
