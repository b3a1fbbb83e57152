use serde::Serialize;

use crate::cmd::{AnalogCommand, Connection};
use crate::exit::{periph_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat, Record};

#[derive(Serialize)]
struct AnalogRecord {
    pin: u8,
    action: &'static str,
    value: u16,
}

impl Record for AnalogRecord {
    fn columns() -> &'static [&'static str] {
        &["pin", "action", "value"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.pin.to_string(),
            self.action.to_string(),
            self.value.to_string(),
        ]
    }

    fn raw(&self) -> String {
        self.value.to_string()
    }
}

pub fn run(command: AnalogCommand, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let session = conn.open()?;
    let analog = session.bridge.analog();

    let record = match command {
        AnalogCommand::Read { pin } => AnalogRecord {
            pin,
            action: "read",
            value: analog
                .analog_read(pin)
                .map_err(|err| periph_error("analog read failed", err))?,
        },
        AnalogCommand::Write { pin, value } => {
            analog
                .analog_write(pin, value)
                .map_err(|err| periph_error("analog write failed", err))?;
            AnalogRecord {
                pin,
                action: "write",
                value: value.min(255),
            }
        }
    };

    print_record(&record, format);
    Ok(SUCCESS)
}
