//! One connected board and its peripheral facades.

use std::sync::Arc;

use ardubridge_channel::{identify, open_and_identify, CommandChannel, RetryPolicy};
use ardubridge_frame::{FramedLink, LinkConfig};
use ardubridge_transport::SerialOpener;
use tracing::info;

use crate::analog::Analog;
use crate::error::Result;
use crate::gpio::Gpio;
use crate::i2c::I2c;
use crate::leds::LedStrip;
use crate::spi::Spi;

/// A board running the bridge firmware.
///
/// ```no_run
/// use ardubridge_channel::RetryPolicy;
/// use ardubridge_frame::LinkConfig;
/// use ardubridge_periph::{Bridge, Level, PinMode};
///
/// let bridge = Bridge::serial("/dev/ttyACM0", 115_200, LinkConfig::default());
/// let identity = bridge.open(&RetryPolicy::default())?;
/// println!("connected to {identity}");
///
/// bridge.gpio().pin_mode(13, PinMode::Output)?;
/// bridge.gpio().digital_write(13, Level::High)?;
/// # Ok::<(), ardubridge_periph::PeriphError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Bridge {
    channel: Arc<CommandChannel>,
    gpio: Gpio,
    analog: Analog,
    i2c: I2c,
    spi: Spi,
    leds: LedStrip,
}

impl Bridge {
    pub fn new(channel: CommandChannel) -> Self {
        let channel = Arc::new(channel);
        Self {
            gpio: Gpio::new(Arc::clone(&channel)),
            analog: Analog::new(Arc::clone(&channel)),
            i2c: I2c::new(Arc::clone(&channel)),
            spi: Spi::new(Arc::clone(&channel)),
            leds: LedStrip::new(Arc::clone(&channel)),
            channel,
        }
    }

    /// A bridge on a serial port. Nothing is opened until [`Bridge::open`].
    pub fn serial(path: impl Into<String>, baud_rate: u32, config: LinkConfig) -> Self {
        let opener = SerialOpener::new(path, baud_rate);
        Self::new(CommandChannel::new(FramedLink::with_config(opener, config)))
    }

    /// Open the port and wait for the board to identify itself.
    pub fn open(&self, policy: &RetryPolicy) -> Result<String> {
        let identity = open_and_identify(&self.channel, policy)?;
        info!(device = %self.channel.describe(), %identity, "bridge ready");
        Ok(identity)
    }

    pub fn close(&self) {
        self.channel.close();
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    pub fn identify(&self) -> Result<String> {
        Ok(identify(&self.channel)?)
    }

    /// Resynchronise the protocol and confirm the board still answers.
    pub fn reset(&self) -> Result<String> {
        self.channel.reset()?;
        self.identify()
    }

    pub fn channel(&self) -> &Arc<CommandChannel> {
        &self.channel
    }

    pub fn gpio(&self) -> &Gpio {
        &self.gpio
    }

    pub fn analog(&self) -> &Analog {
        &self.analog
    }

    pub fn i2c(&self) -> &I2c {
        &self.i2c
    }

    pub fn spi(&self) -> &Spi {
        &self.spi
    }

    pub fn leds(&self) -> &LedStrip {
        &self.leds
    }
}
