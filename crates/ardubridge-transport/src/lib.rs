//! Serial stream abstraction for ArduBridge.
//!
//! Provides a small interface over the byte streams a bridge board can be
//! reached through:
//! - Physical serial ports (USB CDC, FTDI, CH340, ...) via `serialport`
//! - An in-memory emulated board for tests and dry runs
//!
//! This is the lowest layer of ardubridge. Everything else builds on top of
//! the [`BridgeStream`] and [`PortOpener`] traits provided here.

pub mod error;
pub mod memory;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{MemoryDevice, MemoryOpener, WireWrite};
pub use serial::{available_ports, PortInfo, SerialOpener, DEFAULT_BAUD_RATE};
pub use traits::{BridgeStream, PortOpener};
