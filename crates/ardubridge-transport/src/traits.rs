use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// An open byte stream to a bridge board.
///
/// `read` must return `io::ErrorKind::TimedOut` once the timeout set with
/// [`BridgeStream::set_timeout`] elapses without data, which is how
/// `serialport` reports an idle line.
pub trait BridgeStream: Read + Write + Send {
    /// Set the per-call read timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Discard every byte received but not yet read.
    fn clear_input(&mut self) -> Result<()>;

    /// Human-readable device name for logs.
    fn name(&self) -> String;
}

impl std::fmt::Debug for dyn BridgeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeStream")
            .field("name", &self.name())
            .finish()
    }
}

/// Opens fresh streams to one device.
///
/// Called once when a link is opened and again for every reconnect attempt
/// after the device dropped off the bus.
pub trait PortOpener: Send {
    /// Open a new stream to the device.
    fn open(&mut self) -> Result<Box<dyn BridgeStream>>;

    /// Device path or description, used in errors and logs.
    fn describe(&self) -> String;
}
