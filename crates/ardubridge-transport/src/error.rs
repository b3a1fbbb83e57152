/// Errors that can occur while opening or driving a serial stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the named device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to enumerate serial ports.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
