use serde::Serialize;

use crate::cmd::{Connection, I2cCommand, I2cReadArgs, I2cWriteArgs};
use crate::exit::{periph_error, CliResult, SUCCESS};
use crate::output::{hex, print_record, OutputFormat, Record};

#[derive(Serialize)]
struct I2cRecord {
    device: u8,
    register: Option<u8>,
    action: &'static str,
    data: Vec<u8>,
}

impl Record for I2cRecord {
    fn columns() -> &'static [&'static str] {
        &["device", "register", "action", "data"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            format!("0x{:02x}", self.device),
            self.register
                .map(|r| format!("0x{r:02x}"))
                .unwrap_or_else(|| "-".to_string()),
            self.action.to_string(),
            hex(&self.data),
        ]
    }

    fn raw(&self) -> String {
        hex(&self.data)
    }
}

pub fn run(command: I2cCommand, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let session = conn.open()?;
    let record = match command {
        I2cCommand::Read(args) => read(&session.bridge, args)?,
        I2cCommand::Write(args) => write(&session.bridge, args)?,
    };
    print_record(&record, format);
    Ok(SUCCESS)
}

fn read(bridge: &ardubridge_periph::Bridge, args: I2cReadArgs) -> CliResult<I2cRecord> {
    let i2c = bridge.i2c();
    let data = match (args.register, args.delay) {
        (Some(register), Some(delay)) => {
            i2c.read_register_delayed(args.device, register, args.count, delay)
        }
        (Some(register), None) => i2c.read_register(args.device, register, args.count),
        (None, _) => i2c.read_raw(args.device, args.count),
    }
    .map_err(|err| periph_error("i2c read failed", err))?;

    Ok(I2cRecord {
        device: args.device,
        register: args.register,
        action: "read",
        data,
    })
}

fn write(bridge: &ardubridge_periph::Bridge, args: I2cWriteArgs) -> CliResult<I2cRecord> {
    let i2c = bridge.i2c();
    match args.register {
        Some(register) => i2c.write_register(args.device, register, &args.data),
        None => i2c.write_raw(args.device, &args.data),
    }
    .map_err(|err| periph_error("i2c write failed", err))?;

    Ok(I2cRecord {
        device: args.device,
        register: args.register,
        action: "write",
        data: args.data,
    })
}
