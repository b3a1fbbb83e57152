//! Command/reply exchanges with an ArduBridge board.
//!
//! The firmware executes one command at a time and replies with a fixed,
//! opcode-specific number of bytes. [`CommandChannel`] makes sure that many
//! threads sharing one board never interleave their exchanges, and
//! [`Command`] carries the reply layout so callers cannot read the wrong
//! number of bytes.

pub mod channel;
pub mod command;
pub mod error;
pub mod handshake;

pub use channel::{CommandChannel, Exchange};
pub use command::{
    opcode, Command, CommandKind, Descriptor, ReplyLayout, RequestLayout, Terminator,
};
pub use error::{ChannelError, Result};
pub use handshake::{identify, open_and_identify, RetryPolicy};
