//! WS2812 LED strips.

use std::sync::Arc;

use ardubridge_channel::{Command, CommandChannel};

use crate::error::Result;

/// A 24-bit colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack into the firmware's 8-bit `rrrgggbb` format.
    pub fn to_rgb332(self) -> u8 {
        let scale = |value: u8, max: u16| (u16::from(value) * max / 255) as u8;
        (scale(self.r, 7) << 5) | (scale(self.g, 7) << 2) | scale(self.b, 3)
    }
}

/// LED strip facade. The strip must be configured before it is written.
#[derive(Debug, Clone)]
pub struct LedStrip {
    channel: Arc<CommandChannel>,
}

impl LedStrip {
    pub fn new(channel: Arc<CommandChannel>) -> Self {
        Self { channel }
    }

    /// Attach a strip of `count` LEDs to `pin` and fill it with `fill`.
    pub fn configure(&self, pin: u8, count: u16, fill: Rgb) -> Result<()> {
        self.channel
            .exchange(&Command::led_config(pin, count, fill.r, fill.g, fill.b))?;
        Ok(())
    }

    /// Set the colour of the first `colors.len()` LEDs.
    pub fn write(&self, colors: &[Rgb]) -> Result<()> {
        let packed: Vec<u8> = colors.iter().map(|c| c.to_rgb332()).collect();
        self.channel.exchange(&Command::led_write(&packed))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::board;

    #[test]
    fn rgb332_packing() {
        assert_eq!(Rgb::new(255, 255, 255).to_rgb332(), 0xFF);
        assert_eq!(Rgb::new(255, 0, 0).to_rgb332(), 0b1110_0000);
        assert_eq!(Rgb::new(0, 255, 0).to_rgb332(), 0b0001_1100);
        assert_eq!(Rgb::new(0, 0, 255).to_rgb332(), 0b0000_0011);
        assert_eq!(Rgb::new(128, 128, 128).to_rgb332(), 0b0110_1101);
        assert_eq!(Rgb::default().to_rgb332(), 0);
    }

    #[test]
    fn configure_and_write_on_the_wire() {
        let (device, channel) = board(|_| Vec::new());
        let strip = LedStrip::new(channel);

        strip.configure(6, 300, Rgb::new(1, 2, 3)).unwrap();
        strip
            .write(&[Rgb::new(255, 0, 0), Rgb::new(0, 0, 255)])
            .unwrap();

        let writes = device.writes();
        assert_eq!(writes[0].bytes, vec![b'W', 6, 0x2C, 0x01, 1, 2, 3]);
        assert_eq!(writes[1].bytes, vec![b'w', 0xE0, 0x03]);
    }

    #[test]
    fn reserved_packed_colour_is_escaped() {
        let (device, channel) = board(|_| Vec::new());
        let strip = LedStrip::new(channel);

        // 0b000_110_11 == 0x1B
        strip.write(&[Rgb::new(0, 220, 255)]).unwrap();

        assert_eq!(device.wire(), vec![b'w', 0x5C, 0xB1]);
    }
}
