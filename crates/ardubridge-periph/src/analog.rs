//! PWM output and ADC input.

use std::sync::Arc;

use ardubridge_channel::{Command, CommandChannel};

use crate::error::Result;

/// Analog facade.
#[derive(Debug, Clone)]
pub struct Analog {
    channel: Arc<CommandChannel>,
}

impl Analog {
    pub fn new(channel: Arc<CommandChannel>) -> Self {
        Self { channel }
    }

    /// Set a PWM duty cycle. Values above 255 are clamped.
    pub fn analog_write(&self, pin: u8, value: u16) -> Result<()> {
        let duty = u8::try_from(value).unwrap_or(u8::MAX);
        self.channel.exchange(&Command::analog_write(pin, duty))?;
        Ok(())
    }

    /// Read the raw ADC value of `pin` (10 bits on AVR boards).
    pub fn analog_read(&self, pin: u8) -> Result<u16> {
        let reply = self.channel.exchange(&Command::analog_read(pin))?;
        Ok(u16::from_le_bytes([reply[0], reply[1]]))
    }

    /// Pulse `pulse_pin` and capture `samples` 8-bit readings from
    /// `adc_pin` on the board.
    pub fn pulse_and_sample(&self, pulse_pin: u8, adc_pin: u8, samples: u8) -> Result<Vec<u8>> {
        let reply = self
            .channel
            .exchange(&Command::pulse_and_sample(pulse_pin, adc_pin, samples))?;
        Ok(reply.to_vec())
    }
}
