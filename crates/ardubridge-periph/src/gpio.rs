//! Digital pins and hobby servos.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ardubridge_channel::{Command, CommandChannel};
use tracing::debug;

use crate::error::{PeriphError, Result};

/// Pin direction, as understood by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PinMode {
    Output = 0,
    Input = 1,
    Servo = 2,
}

/// Digital pin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        match level {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

/// Digital I/O facade.
#[derive(Debug, Clone)]
pub struct Gpio {
    channel: Arc<CommandChannel>,
}

impl Gpio {
    pub fn new(channel: Arc<CommandChannel>) -> Self {
        Self { channel }
    }

    pub fn pin_mode(&self, pin: u8, mode: PinMode) -> Result<()> {
        self.channel.exchange(&Command::pin_mode(pin, mode as u8))?;
        Ok(())
    }

    pub fn digital_write(&self, pin: u8, level: Level) -> Result<()> {
        self.channel
            .exchange(&Command::digital_write(pin, level.into()))?;
        Ok(())
    }

    pub fn digital_read(&self, pin: u8) -> Result<Level> {
        let reply = self.channel.exchange(&Command::digital_read(pin))?;
        Ok(Level::from(reply[0] != 0))
    }

    /// Set a servo position (0..=255, firmware maps it to pulse width).
    pub fn servo_write(&self, pin: u8, position: u8) -> Result<()> {
        self.channel.exchange(&Command::servo_write(pin, position))?;
        Ok(())
    }

    /// Start an on-board S-curve move from `from` to `to`.
    ///
    /// `accel` is in steps/s² and is sent in units of 10. `step` is the
    /// firmware's update period. The board does not answer; the returned
    /// duration is how long the move is expected to take.
    pub fn servo_sweep(
        &self,
        pin: u8,
        from: u8,
        to: u8,
        accel: f64,
        step: Duration,
    ) -> Result<Duration> {
        if !(10.0..2560.0).contains(&accel) {
            return Err(PeriphError::InvalidArgument(format!(
                "servo acceleration {accel} is outside 10..2560 steps/s²"
            )));
        }
        let step_ms = u8::try_from(step.as_millis()).map_err(|_| {
            PeriphError::InvalidArgument(format!("servo step {step:?} exceeds 255 ms"))
        })?;

        let accel_code = (accel / 10.0) as u8;
        self.channel
            .exchange(&Command::servo_sweep(pin, from, to, accel_code, step_ms))?;

        let distance = f64::from(from.abs_diff(to));
        let expected = Duration::from_secs_f64(2.0 * (distance / accel).sqrt());
        debug!(pin, from, to, ?expected, "servo sweep started");
        Ok(expected)
    }

    /// Drive `pin` high for `on_time`, then low.
    ///
    /// The delay is timed on the host, so jitter of a few milliseconds is
    /// normal.
    pub fn pulse(&self, pin: u8, on_time: Duration) -> Result<()> {
        self.digital_write(pin, Level::High)?;
        thread::sleep(on_time);
        self.digital_write(pin, Level::Low)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::testing::board;

    #[test]
    fn pin_commands_on_the_wire() {
        let (device, channel) = board(|_| vec![1]);
        let gpio = Gpio::new(channel);

        gpio.pin_mode(13, PinMode::Output).unwrap();
        gpio.digital_write(13, Level::High).unwrap();
        gpio.servo_write(9, 200).unwrap();

        let writes: Vec<Vec<u8>> = device.writes().into_iter().map(|w| w.bytes).collect();
        assert_eq!(
            writes,
            vec![vec![b'D', 13, 0], vec![b'O', 13, 1], vec![b'S', 9, 200]]
        );
    }

    #[test]
    fn digital_read_decodes_level() {
        let level = Arc::new(Mutex::new(0u8));
        let reply = Arc::clone(&level);
        let (_device, channel) = board(move |_| vec![*reply.lock().unwrap()]);
        let gpio = Gpio::new(channel);

        assert_eq!(gpio.digital_read(2).unwrap(), Level::Low);
        *level.lock().unwrap() = 1;
        assert!(gpio.digital_read(2).unwrap().is_high());
    }

    #[test]
    fn servo_sweep_encodes_and_estimates() {
        let (device, channel) = board(|_| Vec::new());
        let gpio = Gpio::new(channel);

        let expected = gpio
            .servo_sweep(5, 10, 110, 400.0, Duration::from_millis(20))
            .unwrap();

        assert_eq!(device.wire(), vec![b's', 5, 10, 110, 40, 20]);
        assert_eq!(expected, Duration::from_secs(1));
    }

    #[test]
    fn servo_sweep_rejects_unencodable_arguments() {
        let (device, channel) = board(|_| Vec::new());
        let gpio = Gpio::new(channel);

        for accel in [0.0, 5.0, 3000.0, f64::NAN] {
            let err = gpio
                .servo_sweep(5, 0, 10, accel, Duration::from_millis(20))
                .unwrap_err();
            assert!(matches!(err, PeriphError::InvalidArgument(_)));
        }
        let err = gpio
            .servo_sweep(5, 0, 10, 100.0, Duration::from_millis(300))
            .unwrap_err();
        assert!(matches!(err, PeriphError::InvalidArgument(_)));
        assert!(device.writes().is_empty());
    }

    #[test]
    fn pulse_goes_high_then_low() {
        let (device, channel) = board(|_| vec![1]);
        let gpio = Gpio::new(channel);

        gpio.pulse(7, Duration::from_millis(1)).unwrap();

        assert_eq!(device.wire(), vec![b'O', 7, 1, b'O', 7, 0]);
    }
}
