//! SPI master access.

use std::sync::Arc;

use ardubridge_channel::{Command, CommandChannel};
use tracing::debug;

use crate::error::{PeriphError, Result};

/// Clock polarity/phase, or bus disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpiMode {
    Mode0 = 0,
    Mode1 = 1,
    Mode2 = 2,
    Mode3 = 3,
    Off = 4,
}

/// SPI facade.
#[derive(Debug, Clone)]
pub struct Spi {
    channel: Arc<CommandChannel>,
}

impl Spi {
    pub fn new(channel: Arc<CommandChannel>) -> Self {
        Self { channel }
    }

    /// Configure the bus. The clock is sent in units of 100 Hz.
    pub fn set_mode(&self, mode: SpiMode, hz: u32) -> Result<()> {
        let code = u16::try_from(hz / 100).map_err(|_| {
            PeriphError::InvalidArgument(format!("spi frequency {hz} Hz exceeds 6.5535 MHz"))
        })?;
        self.channel.exchange(&Command::spi_config(mode as u8, code))?;
        debug!(?mode, hz, "spi configured");
        Ok(())
    }

    /// Release the SPI pins.
    pub fn off(&self) -> Result<()> {
        self.set_mode(SpiMode::Off, 0)
    }

    /// Clock `data` out and return the bytes clocked in, one per byte sent.
    pub fn transfer(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(PeriphError::InvalidArgument(
                "spi transfer needs at least one byte".to_string(),
            ));
        }
        let reply = self.channel.exchange(&Command::spi_transfer(data)?)?;
        Ok(reply.to_vec())
    }
}
