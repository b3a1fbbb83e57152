use ardubridge_periph::SpiMode;
use serde::Serialize;

use crate::cmd::{Connection, SpiArgs};
use crate::exit::{periph_error, CliResult, SUCCESS};
use crate::output::{hex, print_record, OutputFormat, Record};

#[derive(Serialize)]
struct SpiRecord {
    mode: u8,
    frequency: u32,
    sent: Vec<u8>,
    received: Vec<u8>,
}

impl Record for SpiRecord {
    fn columns() -> &'static [&'static str] {
        &["mode", "frequency", "sent", "received"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.mode.to_string(),
            self.frequency.to_string(),
            hex(&self.sent),
            hex(&self.received),
        ]
    }

    fn raw(&self) -> String {
        hex(&self.received)
    }
}

pub fn run(args: SpiArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let session = conn.open()?;
    let spi = session.bridge.spi();

    let mode = match args.mode {
        0 => SpiMode::Mode0,
        1 => SpiMode::Mode1,
        2 => SpiMode::Mode2,
        _ => SpiMode::Mode3,
    };
    spi.set_mode(mode, args.frequency)
        .map_err(|err| periph_error("spi configuration failed", err))?;
    let received = spi
        .transfer(&args.data)
        .map_err(|err| periph_error("spi transfer failed", err))?;

    print_record(
        &SpiRecord {
            mode: args.mode,
            frequency: args.frequency,
            sent: args.data,
            received,
        },
        format,
    );
    Ok(SUCCESS)
}
