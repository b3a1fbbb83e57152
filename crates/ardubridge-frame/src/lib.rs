//! Byte-stuffed framing over a serial link.
//!
//! The bridge protocol has no length prefix and no checksum. Two byte values
//! are reserved on the wire:
//! - `0x1B` (RESET) tells the receiver to abandon the current frame
//! - `0x5C` (ESCAPE) introduces a nibble-swapped literal
//!
//! Every other byte travels unchanged. [`FramedLink`] applies this mapping,
//! owns the serial stream, and reopens it when the device drops off the bus.

pub mod codec;
pub mod error;
pub mod link;

pub use codec::{escape, escape_to_vec, is_reserved, swap_nibbles, unescape, ESCAPE, RESET};
pub use error::{LinkError, Result};
pub use link::{FramedLink, LinkConfig, LinkState};
