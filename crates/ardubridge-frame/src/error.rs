use ardubridge_transport::TransportError;

/// Errors that can occur on a framed link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The serial device could not be opened.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(TransportError),

    /// The link is closed.
    #[error("link is closed")]
    Closed,

    /// The expected bytes did not arrive within the retry budget.
    #[error("timed out waiting for reply")]
    Timeout,

    /// A bare RESET byte arrived where data was expected.
    #[error("unexpected RESET from device")]
    UnexpectedReset,

    /// An ESCAPE byte was not followed by its continuation in time.
    #[error("incomplete escape sequence")]
    IncompleteEscape,

    /// An ESCAPE byte was followed by a byte that encodes no reserved value.
    #[error("malformed escape sequence (0x5c 0x{0:02x})")]
    MalformedEscape(u8),

    /// An I/O error the reconnect loop could not absorb.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for LinkError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(io) => LinkError::Io(io),
            other => LinkError::DeviceUnavailable(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
