use std::time::Duration;

use ardubridge_channel::RetryPolicy;
use ardubridge_frame::LinkConfig;
use ardubridge_periph::Bridge;
use clap::{Args, Subcommand, ValueEnum};
use tracing::debug;

use crate::exit::{channel_error, periph_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod analog;
pub mod gpio;
pub mod i2c;
pub mod id;
pub mod monitor;
pub mod ports;
pub mod spi;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports.
    Ports,
    /// Print the board's identification string.
    Id,
    /// Resynchronise the protocol and re-identify the board.
    Reset,
    /// Digital pins.
    #[command(subcommand)]
    Gpio(GpioCommand),
    /// PWM output and ADC input.
    #[command(subcommand)]
    Analog(AnalogCommand),
    /// I2C bus transactions.
    #[command(subcommand)]
    I2c(I2cCommand),
    /// One SPI transfer.
    Spi(SpiArgs),
    /// Poll a pin and print each reading.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports => ports::run(format),
        Command::Id => id::run(conn, format),
        Command::Reset => id::reset(conn, format),
        Command::Gpio(command) => gpio::run(command, conn, format),
        Command::Analog(command) => analog::run(command, conn, format),
        Command::I2c(command) => i2c::run(command, conn, format),
        Command::Spi(args) => spi::run(args, conn, format),
        Command::Monitor(args) => monitor::run(args, conn, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the board is and how hard to try reaching it.
#[derive(Debug, Clone)]
pub struct Connection {
    pub port: Option<String>,
    pub baud: u32,
    pub retries: u32,
}

/// An open board plus what it told us about itself.
pub struct Session {
    pub bridge: Bridge,
    pub port: String,
    pub identity: String,
}

impl Connection {
    pub fn open(&self) -> CliResult<Session> {
        let port = self.port.clone().ok_or_else(|| {
            CliError::new(
                USAGE,
                "no serial port given (use --port or ARDUBRIDGE_PORT)",
            )
        })?;

        let config = LinkConfig {
            reconnect_attempts: Some(3),
            ..LinkConfig::default()
        };
        let bridge = Bridge::serial(port.clone(), self.baud, config);

        // A port that cannot be opened at all is reported as such rather
        // than as an identification timeout.
        bridge
            .channel()
            .open()
            .map_err(|err| channel_error("open failed", err))?;

        let policy = RetryPolicy::with_retries(self.retries);
        let identity = bridge
            .open(&policy)
            .map_err(|err| periph_error("identify failed", err))?;
        debug!(%port, %identity, "session open");

        Ok(Session {
            bridge,
            port,
            identity,
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum GpioCommand {
    /// Set a pin's mode.
    Mode {
        pin: u8,
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// Read a digital pin.
    Read { pin: u8 },
    /// Drive a digital pin.
    Write {
        pin: u8,
        #[arg(value_enum)]
        level: LevelArg,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ModeArg {
    Output,
    Input,
    Servo,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LevelArg {
    #[value(alias = "1")]
    High,
    #[value(alias = "0")]
    Low,
}

#[derive(Subcommand, Debug)]
pub enum AnalogCommand {
    /// Read an ADC channel.
    Read { pin: u8 },
    /// Set a PWM duty cycle (0-255, larger values are clamped).
    Write { pin: u8, value: u16 },
}

#[derive(Subcommand, Debug)]
pub enum I2cCommand {
    /// Read bytes from a device.
    Read(I2cReadArgs),
    /// Write bytes to a device.
    Write(I2cWriteArgs),
}

#[derive(Args, Debug)]
pub struct I2cReadArgs {
    /// 7-bit device address (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_byte)]
    pub device: u8,
    /// Number of bytes to read.
    pub count: u8,
    /// Register to select before reading.
    #[arg(long, short = 'r', value_parser = parse_byte)]
    pub register: Option<u8>,
    /// Wait between register select and read (e.g. 50ms). Needs --register.
    #[arg(long, requires = "register", value_parser = parse_duration)]
    pub delay: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct I2cWriteArgs {
    /// 7-bit device address (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_byte)]
    pub device: u8,
    /// Bytes to write (decimal or 0x-prefixed hex).
    #[arg(required = true, value_parser = parse_byte)]
    pub data: Vec<u8>,
    /// Register to write to.
    #[arg(long, short = 'r', value_parser = parse_byte)]
    pub register: Option<u8>,
}

#[derive(Args, Debug)]
pub struct SpiArgs {
    /// Bytes to send (decimal or 0x-prefixed hex).
    #[arg(required = true, value_parser = parse_byte)]
    pub data: Vec<u8>,
    /// Clock polarity/phase mode.
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=3))]
    pub mode: u8,
    /// Bus clock in Hz.
    #[arg(long, default_value = "1000000")]
    pub frequency: u32,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Pin to poll.
    pub pin: u8,
    /// Read the ADC instead of the digital level.
    #[arg(long)]
    pub analog: bool,
    /// Time between readings (e.g. 1s, 250ms).
    #[arg(long, default_value = "500ms", value_parser = parse_duration)]
    pub interval: Duration,
    /// Exit after N readings (at least one).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a byte written in decimal or with a `0x` prefix.
pub fn parse_byte(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid byte value: {input}"))
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}
