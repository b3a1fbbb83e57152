//! I2C master access through the firmware's `'2'` sub-protocol.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ardubridge_channel::{Command, CommandChannel};
use tracing::{debug, warn};

use crate::error::{I2cStatus, PeriphError, Result};

const MAX_ADDRESS: u8 = 0x7F;

/// I2C facade.
#[derive(Debug, Clone)]
pub struct I2c {
    channel: Arc<CommandChannel>,
}

impl I2c {
    pub fn new(channel: Arc<CommandChannel>) -> Self {
        Self { channel }
    }

    /// Set the bus clock. The firmware only knows multiples of 10 kHz.
    pub fn set_frequency(&self, hz: u32) -> Result<()> {
        let code = u8::try_from(hz / 10_000)
            .ok()
            .filter(|code| *code > 0)
            .ok_or_else(|| {
                PeriphError::InvalidArgument(format!(
                    "i2c frequency {hz} Hz is outside 10 kHz..2.55 MHz"
                ))
            })?;
        self.channel.exchange(&Command::i2c_frequency(code))?;
        debug!(hz, "i2c frequency set");
        Ok(())
    }

    /// Write `data` to `device` with no register prefix.
    pub fn write_raw(&self, device: u8, data: &[u8]) -> Result<()> {
        check_address(device)?;
        let command = Command::i2c_write(device, data)?;
        let reply = self.channel.exchange(&command)?;
        check_status(device, reply[0])
    }

    /// Write `data` starting at `register`.
    pub fn write_register(&self, device: u8, register: u8, data: &[u8]) -> Result<()> {
        let mut payload = Vec::with_capacity(1 + data.len());
        payload.push(register);
        payload.extend_from_slice(data);
        self.write_raw(device, &payload)
    }

    /// Read `count` bytes from `device` with no register select.
    pub fn read_raw(&self, device: u8, count: u8) -> Result<Vec<u8>> {
        check_address(device)?;
        let reply = self.channel.exchange(&Command::i2c_read(device, count))?;
        Ok(reply.to_vec())
    }

    /// Select `register` and read `count` bytes in a single frame.
    pub fn read_register(&self, device: u8, register: u8, count: u8) -> Result<Vec<u8>> {
        check_address(device)?;
        let reply = self
            .channel
            .exchange(&Command::i2c_write_read(device, register, count))?;
        check_status(device, reply[0])?;
        Ok(reply[1..].to_vec())
    }

    /// Select `register`, wait `delay`, then read `count` bytes.
    ///
    /// For sensors that need time between the register write and the data
    /// being ready. The channel stays reserved for the whole sequence.
    pub fn read_register_delayed(
        &self,
        device: u8,
        register: u8,
        count: u8,
        delay: Duration,
    ) -> Result<Vec<u8>> {
        check_address(device)?;
        let mut exchange = self.channel.lock();

        let status = exchange.transact(&Command::i2c_select(device, register))?;
        check_status(device, status[0])?;
        thread::sleep(delay);
        let data = exchange.transact(&Command::i2c_read_selected(count))?;
        Ok(data.to_vec())
    }
}

fn check_address(device: u8) -> Result<()> {
    if device > MAX_ADDRESS {
        return Err(PeriphError::InvalidArgument(format!(
            "i2c address 0x{device:02x} is not a 7-bit address"
        )));
    }
    Ok(())
}

fn check_status(device: u8, byte: u8) -> Result<()> {
    let status = I2cStatus::from_byte(byte);
    if status.is_ok() {
        return Ok(());
    }
    warn!(device, %status, "i2c transaction rejected");
    Err(PeriphError::I2c { device, status })
}
