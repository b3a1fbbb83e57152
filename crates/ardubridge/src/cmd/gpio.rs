use ardubridge_periph::{Level, PinMode};
use serde::Serialize;

use crate::cmd::{Connection, GpioCommand, LevelArg, ModeArg};
use crate::exit::{periph_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat, Record};

#[derive(Serialize)]
struct PinRecord {
    pin: u8,
    action: &'static str,
    value: String,
}

impl Record for PinRecord {
    fn columns() -> &'static [&'static str] {
        &["pin", "action", "value"]
    }

    fn cells(&self) -> Vec<String> {
        vec![self.pin.to_string(), self.action.to_string(), self.value.clone()]
    }

    fn raw(&self) -> String {
        self.value.clone()
    }
}

pub fn run(command: GpioCommand, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let session = conn.open()?;
    let gpio = session.bridge.gpio();

    let record = match command {
        GpioCommand::Mode { pin, mode } => {
            let mode = match mode {
                ModeArg::Output => PinMode::Output,
                ModeArg::Input => PinMode::Input,
                ModeArg::Servo => PinMode::Servo,
            };
            gpio.pin_mode(pin, mode)
                .map_err(|err| periph_error("pin mode failed", err))?;
            PinRecord {
                pin,
                action: "mode",
                value: format!("{mode:?}").to_lowercase(),
            }
        }
        GpioCommand::Read { pin } => {
            let level = gpio
                .digital_read(pin)
                .map_err(|err| periph_error("digital read failed", err))?;
            PinRecord {
                pin,
                action: "read",
                value: level_name(level).to_string(),
            }
        }
        GpioCommand::Write { pin, level } => {
            let level = match level {
                LevelArg::High => Level::High,
                LevelArg::Low => Level::Low,
            };
            gpio.digital_write(pin, level)
                .map_err(|err| periph_error("digital write failed", err))?;
            PinRecord {
                pin,
                action: "write",
                value: level_name(level).to_string(),
            }
        }
    };

    print_record(&record, format);
    Ok(SUCCESS)
}

pub fn level_name(level: Level) -> &'static str {
    match level {
        Level::High => "high",
        Level::Low => "low",
    }
}
