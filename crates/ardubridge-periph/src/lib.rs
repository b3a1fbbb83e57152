//! Peripheral access through an ArduBridge board.
//!
//! This is the "just works" layer. Open a [`Bridge`], then drive pins and
//! buses through its facades. Every facade shares the bridge's single
//! command channel, so they can be cloned into as many threads as needed.

pub mod analog;
pub mod bridge;
pub mod error;
pub mod gpio;
pub mod i2c;
pub mod leds;
pub mod spi;

#[cfg(test)]
mod testing;

pub use analog::Analog;
pub use bridge::Bridge;
pub use error::{I2cStatus, PeriphError, Result};
pub use gpio::{Gpio, Level, PinMode};
pub use i2c::I2c;
pub use leds::{LedStrip, Rgb};
pub use spi::{Spi, SpiMode};
