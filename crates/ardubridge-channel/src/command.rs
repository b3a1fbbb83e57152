//! Firmware command table.
//!
//! Every operation the firmware understands is listed once in
//! [`CommandKind`], together with its request layout, the shape of its
//! reply, and whether the frame must be closed with a raw RESET. The
//! protocol has no length field, so this table is the only place reply
//! lengths are defined.

use bytes::Bytes;

use crate::error::{ChannelError, Result};

/// Opcode bytes (first byte of every request).
pub mod opcode {
    pub const PIN_MODE: u8 = b'D';
    pub const DIGITAL_WRITE: u8 = b'O';
    pub const DIGITAL_READ: u8 = b'I';
    pub const SERVO_WRITE: u8 = b'S';
    pub const SERVO_SWEEP: u8 = b's';
    pub const ANALOG_WRITE: u8 = b'P';
    pub const ANALOG_READ: u8 = b'A';
    pub const PULSE_AND_SAMPLE: u8 = b'C';
    pub const I2C: u8 = b'2';
    pub const SPI: u8 = b'3';
    pub const SPI_CONFIG: u8 = b'4';
    pub const LED_CONFIG: u8 = b'W';
    pub const LED_WRITE: u8 = b'w';
    pub const IDENTIFY: u8 = b'?';
}

/// I2C sub-protocol markers.
pub mod i2c_marker {
    pub const ADDRESS: u8 = b'A';
    pub const LENGTH: u8 = b'L';
    pub const FREQUENCY: u8 = b'F';
    pub const WRITE: u8 = b'W';
    pub const WRITE_RESTART: u8 = b'w';
    pub const READ: u8 = b'R';
}

/// Request size rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLayout {
    /// Exactly this many bytes, opcode included.
    Fixed(usize),
    /// At least this many bytes, opcode included.
    AtLeast(usize),
}

/// Reply shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLayout {
    /// The firmware does not answer.
    None,
    /// Exactly this many bytes.
    Fixed(usize),
    /// As many bytes as the request byte at this index.
    Operand(usize),
    /// One byte per request byte after the opcode.
    Echo,
    /// One count byte, then that many bytes. Only the data is returned.
    Counted,
    /// One status byte, one count byte, then that many bytes. The status
    /// byte is returned followed by the data.
    StatusThenCounted,
}

/// What follows the escaped request on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    None,
    /// A raw RESET ends a streaming sub-protocol (SPI, I2C configuration).
    Reset,
}

/// Firmware operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    PinMode,
    DigitalWrite,
    DigitalRead,
    ServoWrite,
    ServoSweep,
    AnalogWrite,
    AnalogRead,
    PulseAndSample,
    I2cFrequency,
    I2cWrite,
    I2cRead,
    I2cWriteRead,
    I2cSelect,
    I2cReadSelected,
    SpiConfig,
    SpiTransfer,
    LedConfig,
    LedWrite,
    Identify,
}

/// Static description of one [`CommandKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: CommandKind,
    pub name: &'static str,
    pub opcode: u8,
    pub request: RequestLayout,
    pub reply: ReplyLayout,
    pub terminator: Terminator,
}

const fn entry(
    kind: CommandKind,
    name: &'static str,
    opcode: u8,
    request: RequestLayout,
    reply: ReplyLayout,
    terminator: Terminator,
) -> Descriptor {
    Descriptor {
        kind,
        name,
        opcode,
        request,
        reply,
        terminator,
    }
}

use CommandKind as K;
use ReplyLayout as Rep;
use RequestLayout as Req;

// Indexed by `CommandKind as usize`.
static DESCRIPTORS: [Descriptor; 19] = [
    entry(K::PinMode, "pin-mode", opcode::PIN_MODE, Req::Fixed(3), Rep::Fixed(1), Terminator::None),
    entry(K::DigitalWrite, "digital-write", opcode::DIGITAL_WRITE, Req::Fixed(3), Rep::Fixed(1), Terminator::None),
    entry(K::DigitalRead, "digital-read", opcode::DIGITAL_READ, Req::Fixed(2), Rep::Fixed(1), Terminator::None),
    entry(K::ServoWrite, "servo-write", opcode::SERVO_WRITE, Req::Fixed(3), Rep::Fixed(1), Terminator::None),
    entry(K::ServoSweep, "servo-sweep", opcode::SERVO_SWEEP, Req::Fixed(6), Rep::None, Terminator::None),
    entry(K::AnalogWrite, "analog-write", opcode::ANALOG_WRITE, Req::Fixed(3), Rep::Fixed(1), Terminator::None),
    entry(K::AnalogRead, "analog-read", opcode::ANALOG_READ, Req::Fixed(2), Rep::Fixed(2), Terminator::None),
    entry(K::PulseAndSample, "pulse-and-sample", opcode::PULSE_AND_SAMPLE, Req::Fixed(4), Rep::Operand(3), Terminator::None),
    entry(K::I2cFrequency, "i2c-frequency", opcode::I2C, Req::Fixed(3), Rep::None, Terminator::Reset),
    entry(K::I2cWrite, "i2c-write", opcode::I2C, Req::AtLeast(6), Rep::Fixed(1), Terminator::None),
    entry(K::I2cRead, "i2c-read", opcode::I2C, Req::Fixed(6), Rep::Counted, Terminator::None),
    entry(K::I2cWriteRead, "i2c-write-read", opcode::I2C, Req::Fixed(11), Rep::StatusThenCounted, Terminator::None),
    entry(K::I2cSelect, "i2c-select", opcode::I2C, Req::Fixed(7), Rep::Fixed(1), Terminator::None),
    entry(K::I2cReadSelected, "i2c-read-selected", opcode::I2C, Req::Fixed(4), Rep::Counted, Terminator::None),
    entry(K::SpiConfig, "spi-config", opcode::SPI_CONFIG, Req::Fixed(4), Rep::Fixed(1), Terminator::None),
    entry(K::SpiTransfer, "spi-transfer", opcode::SPI, Req::AtLeast(2), Rep::Echo, Terminator::Reset),
    entry(K::LedConfig, "led-config", opcode::LED_CONFIG, Req::Fixed(7), Rep::None, Terminator::None),
    entry(K::LedWrite, "led-write", opcode::LED_WRITE, Req::AtLeast(1), Rep::None, Terminator::None),
    entry(K::Identify, "identify", opcode::IDENTIFY, Req::Fixed(1), Rep::Counted, Terminator::None),
];

impl CommandKind {
    /// Every kind, in table order.
    pub const ALL: [CommandKind; 19] = [
        K::PinMode,
        K::DigitalWrite,
        K::DigitalRead,
        K::ServoWrite,
        K::ServoSweep,
        K::AnalogWrite,
        K::AnalogRead,
        K::PulseAndSample,
        K::I2cFrequency,
        K::I2cWrite,
        K::I2cRead,
        K::I2cWriteRead,
        K::I2cSelect,
        K::I2cReadSelected,
        K::SpiConfig,
        K::SpiTransfer,
        K::LedConfig,
        K::LedWrite,
        K::Identify,
    ];

    pub fn descriptor(self) -> &'static Descriptor {
        &DESCRIPTORS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}

/// A validated request frame (before escaping).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: CommandKind,
    bytes: Bytes,
}

impl Command {
    /// Wrap raw request bytes, checking them against the command table.
    pub fn new(kind: CommandKind, bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        let desc = kind.descriptor();

        if bytes.first() != Some(&desc.opcode) {
            return Err(ChannelError::InvalidCommand(format!(
                "{} must start with opcode 0x{:02x}",
                desc.name, desc.opcode
            )));
        }

        let len_ok = match desc.request {
            RequestLayout::Fixed(n) => bytes.len() == n,
            RequestLayout::AtLeast(n) => bytes.len() >= n,
        };
        if !len_ok {
            return Err(ChannelError::InvalidCommand(format!(
                "{} request is {} bytes, layout is {:?}",
                desc.name,
                bytes.len(),
                desc.request
            )));
        }

        if let ReplyLayout::Operand(index) = desc.reply {
            if index >= bytes.len() {
                return Err(ChannelError::InvalidCommand(format!(
                    "{} reply length operand {index} is missing",
                    desc.name
                )));
            }
        }

        Ok(Self { kind, bytes })
    }

    // Inputs below are fixed-size, so the table check cannot fail.
    fn build(kind: CommandKind, bytes: Vec<u8>) -> Self {
        debug_assert!(Self::new(kind, bytes.clone()).is_ok());
        Self {
            kind,
            bytes: Bytes::from(bytes),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        self.kind.descriptor()
    }

    /// Request bytes, unescaped.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reply length when it is known before the exchange starts.
    ///
    /// `None` for count-prefixed replies.
    pub fn reply_len(&self) -> Option<usize> {
        match self.descriptor().reply {
            ReplyLayout::None => Some(0),
            ReplyLayout::Fixed(n) => Some(n),
            ReplyLayout::Operand(index) => Some(usize::from(self.bytes[index])),
            ReplyLayout::Echo => Some(self.bytes.len() - 1),
            ReplyLayout::Counted | ReplyLayout::StatusThenCounted => None,
        }
    }

    pub fn identify() -> Self {
        Self::build(K::Identify, vec![opcode::IDENTIFY])
    }

    pub fn pin_mode(pin: u8, mode: u8) -> Self {
        Self::build(K::PinMode, vec![opcode::PIN_MODE, pin, mode])
    }

    pub fn digital_write(pin: u8, value: u8) -> Self {
        Self::build(K::DigitalWrite, vec![opcode::DIGITAL_WRITE, pin, value])
    }

    pub fn digital_read(pin: u8) -> Self {
        Self::build(K::DigitalRead, vec![opcode::DIGITAL_READ, pin])
    }

    pub fn servo_write(pin: u8, value: u8) -> Self {
        Self::build(K::ServoWrite, vec![opcode::SERVO_WRITE, pin, value])
    }

    /// On-board S-curve move. `accel` is in units of 10 steps/s².
    pub fn servo_sweep(pin: u8, from: u8, to: u8, accel: u8, step_ms: u8) -> Self {
        Self::build(
            K::ServoSweep,
            vec![opcode::SERVO_SWEEP, pin, from, to, accel, step_ms],
        )
    }

    pub fn analog_write(pin: u8, value: u8) -> Self {
        Self::build(K::AnalogWrite, vec![opcode::ANALOG_WRITE, pin, value])
    }

    pub fn analog_read(pin: u8) -> Self {
        Self::build(K::AnalogRead, vec![opcode::ANALOG_READ, pin])
    }

    pub fn pulse_and_sample(pulse_pin: u8, adc_pin: u8, samples: u8) -> Self {
        Self::build(
            K::PulseAndSample,
            vec![opcode::PULSE_AND_SAMPLE, pulse_pin, adc_pin, samples],
        )
    }

    /// Bus clock in units of 10 kHz.
    pub fn i2c_frequency(code: u8) -> Self {
        Self::build(
            K::I2cFrequency,
            vec![opcode::I2C, i2c_marker::FREQUENCY, code],
        )
    }

    /// Plain write of `data` to `device`.
    pub fn i2c_write(device: u8, data: &[u8]) -> Result<Self> {
        let len = u8::try_from(data.len()).map_err(|_| {
            ChannelError::InvalidCommand(format!(
                "i2c write of {} bytes exceeds 255",
                data.len()
            ))
        })?;
        let mut bytes = Vec::with_capacity(6 + data.len());
        bytes.extend_from_slice(&[
            opcode::I2C,
            i2c_marker::ADDRESS,
            device,
            i2c_marker::LENGTH,
            len,
            i2c_marker::WRITE,
        ]);
        bytes.extend_from_slice(data);
        Ok(Self::build(K::I2cWrite, bytes))
    }

    pub fn i2c_read(device: u8, count: u8) -> Self {
        Self::build(
            K::I2cRead,
            vec![
                opcode::I2C,
                i2c_marker::ADDRESS,
                device,
                i2c_marker::LENGTH,
                count,
                i2c_marker::READ,
            ],
        )
    }

    /// Register select with repeated start, then read, in one frame.
    pub fn i2c_write_read(device: u8, register: u8, count: u8) -> Self {
        let mut bytes = Self::i2c_select_bytes(device, register);
        bytes.extend_from_slice(&[opcode::I2C, i2c_marker::LENGTH, count, i2c_marker::READ]);
        Self::build(K::I2cWriteRead, bytes)
    }

    /// Register select with repeated start, no read.
    pub fn i2c_select(device: u8, register: u8) -> Self {
        Self::build(K::I2cSelect, Self::i2c_select_bytes(device, register))
    }

    /// Read from the device addressed by the last select.
    pub fn i2c_read_selected(count: u8) -> Self {
        Self::build(
            K::I2cReadSelected,
            vec![opcode::I2C, i2c_marker::LENGTH, count, i2c_marker::READ],
        )
    }

    fn i2c_select_bytes(device: u8, register: u8) -> Vec<u8> {
        vec![
            opcode::I2C,
            i2c_marker::ADDRESS,
            device,
            i2c_marker::LENGTH,
            1,
            i2c_marker::WRITE_RESTART,
            register,
        ]
    }

    /// Bus clock in units of 100 Hz.
    pub fn spi_config(mode: u8, freq_code: u16) -> Self {
        let [lo, hi] = freq_code.to_le_bytes();
        Self::build(K::SpiConfig, vec![opcode::SPI_CONFIG, mode, lo, hi])
    }

    pub fn spi_transfer(data: &[u8]) -> Result<Self> {
        let mut bytes = Vec::with_capacity(1 + data.len());
        bytes.push(opcode::SPI);
        bytes.extend_from_slice(data);
        Self::new(K::SpiTransfer, bytes)
    }

    pub fn led_config(pin: u8, count: u16, red: u8, green: u8, blue: u8) -> Self {
        let [lo, hi] = count.to_le_bytes();
        Self::build(
            K::LedConfig,
            vec![opcode::LED_CONFIG, pin, lo, hi, red, green, blue],
        )
    }

    pub fn led_write(packed: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(1 + packed.len());
        bytes.push(opcode::LED_WRITE);
        bytes.extend_from_slice(packed);
        Self::build(K::LedWrite, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_kind() {
        for kind in CommandKind::ALL {
            assert_eq!(kind.descriptor().kind, kind, "{kind:?} out of order");
        }
    }

    #[test]
    fn builders_match_their_descriptor() {
        let commands = [
            Command::identify(),
            Command::pin_mode(13, 0),
            Command::digital_write(13, 1),
            Command::digital_read(2),
            Command::servo_write(9, 90),
            Command::servo_sweep(9, 0, 180, 20, 50),
            Command::analog_write(5, 128),
            Command::analog_read(0),
            Command::pulse_and_sample(7, 1, 64),
            Command::i2c_frequency(10),
            Command::i2c_write(0x14, &[0x10, 0, 1, 2]).unwrap(),
            Command::i2c_read(0x14, 3),
            Command::i2c_write_read(0x14, 0x10, 3),
            Command::i2c_select(0x14, 0x10),
            Command::i2c_read_selected(3),
            Command::spi_config(0, 10_000),
            Command::spi_transfer(&[1, 2, 3]).unwrap(),
            Command::led_config(6, 300, 1, 2, 3),
            Command::led_write(&[0xFF, 0x00]),
        ];
        for command in commands {
            let rebuilt = Command::new(command.kind(), command.bytes().to_vec());
            assert!(rebuilt.is_ok(), "{:?} failed validation", command.kind());
        }
    }

    #[test]
    fn i2c_register_write_layout() {
        let cmd = Command::i2c_write(0x14, &[0x10, 0, 1, 2]).unwrap();
        assert_eq!(
            cmd.bytes(),
            &[b'2', b'A', 0x14, b'L', 4, b'W', 0x10, 0x00, 0x01, 0x02]
        );
    }

    #[test]
    fn i2c_register_read_layout() {
        let cmd = Command::i2c_write_read(0x14, 0x10, 3);
        assert_eq!(
            cmd.bytes(),
            &[b'2', b'A', 0x14, b'L', 1, b'w', 0x10, b'2', b'L', 3, b'R']
        );
        assert_eq!(cmd.reply_len(), None);
    }

    #[test]
    fn reply_lengths() {
        assert_eq!(Command::analog_read(0).reply_len(), Some(2));
        assert_eq!(Command::pulse_and_sample(7, 1, 64).reply_len(), Some(64));
        assert_eq!(Command::spi_transfer(&[1, 2, 3]).unwrap().reply_len(), Some(3));
        assert_eq!(Command::led_write(&[1]).reply_len(), Some(0));
        assert_eq!(Command::identify().reply_len(), None);
    }

    #[test]
    fn wrong_opcode_is_rejected() {
        let err = Command::new(CommandKind::DigitalRead, vec![b'O', 1]).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidCommand(_)));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(Command::new(CommandKind::DigitalRead, vec![b'I']).is_err());
        assert!(Command::new(CommandKind::DigitalRead, vec![b'I', 1, 2]).is_err());
        assert!(Command::new(CommandKind::SpiTransfer, vec![b'3']).is_err());
        assert!(Command::new(CommandKind::Identify, Vec::new()).is_err());
    }

    #[test]
    fn oversized_i2c_write_is_rejected() {
        let data = vec![0u8; 256];
        assert!(Command::i2c_write(0x20, &data).is_err());
    }

    #[test]
    fn spi_config_encodes_frequency_little_endian() {
        let cmd = Command::spi_config(3, 0x1234);
        assert_eq!(cmd.bytes(), &[b'4', 3, 0x34, 0x12]);
    }
}
