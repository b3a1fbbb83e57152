//! Host-side control of Arduino boards running the ArduBridge firmware.
//!
//! The board is driven over a serial link with a byte-stuffed binary
//! protocol. Every peripheral shares that one link; exchanges are
//! serialized so replies always reach the thread that asked.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial ports, port enumeration and an in-memory device
//! - [`frame`]: byte stuffing and the reconnecting framed link
//! - [`channel`]: the command table, serialized exchanges, identification
//! - [`periph`]: GPIO, analog, I2C, SPI and LED strip facades (behind `periph` feature)

/// Re-export transport types.
pub mod transport {
    pub use ardubridge_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ardubridge_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use ardubridge_channel::*;
}

/// Re-export peripheral types (requires `periph` feature).
#[cfg(feature = "periph")]
pub mod periph {
    pub use ardubridge_periph::*;
}

#[cfg(feature = "periph")]
pub use ardubridge_periph::Bridge;
