use std::fmt;

use ardubridge_channel::ChannelError;

/// Status byte returned by the firmware's I2C sub-protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cStatus {
    Ok,
    Unescape,
    Length,
    Read,
    WriteData,
    SendData,
    Unknown(u8),
}

impl I2cStatus {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'N' => I2cStatus::Ok,
            b'U' => I2cStatus::Unescape,
            b'L' => I2cStatus::Length,
            b'R' => I2cStatus::Read,
            b'W' => I2cStatus::WriteData,
            b'S' => I2cStatus::SendData,
            other => I2cStatus::Unknown(other),
        }
    }

    pub fn is_ok(self) -> bool {
        self == I2cStatus::Ok
    }
}

impl fmt::Display for I2cStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            I2cStatus::Ok => f.write_str("OK"),
            I2cStatus::Unescape => f.write_str("UNESCAPE"),
            I2cStatus::Length => f.write_str("LENGTH"),
            I2cStatus::Read => f.write_str("READ"),
            I2cStatus::WriteData => f.write_str("WRITE-DATA"),
            I2cStatus::SendData => f.write_str("SEND-DATA"),
            I2cStatus::Unknown(byte) => write!(f, "UNKNOWN(0x{byte:02x})"),
        }
    }
}

/// Errors returned by peripheral facades.
#[derive(Debug, thiserror::Error)]
pub enum PeriphError {
    /// Channel-level error.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The I2C transaction was rejected by the firmware.
    #[error("i2c device 0x{device:02x}: {status}")]
    I2c { device: u8, status: I2cStatus },

    /// An argument cannot be encoded in the command.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, PeriphError>;
