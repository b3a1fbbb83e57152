use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::cmd::gpio::level_name;
use crate::cmd::{Connection, MonitorArgs};
use crate::exit::{periph_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_record, OutputFormat, Record};

#[derive(Serialize)]
struct Sample {
    pin: u8,
    kind: &'static str,
    value: u16,
    timestamp: String,
}

impl Record for Sample {
    fn columns() -> &'static [&'static str] {
        &["pin", "kind", "value", "timestamp"]
    }

    fn cells(&self) -> Vec<String> {
        let value = match self.kind {
            "digital" => level_name((self.value != 0).into()).to_string(),
            _ => self.value.to_string(),
        };
        vec![
            self.pin.to_string(),
            self.kind.to_string(),
            value,
            self.timestamp.clone(),
        ]
    }

    fn raw(&self) -> String {
        self.value.to_string()
    }
}

pub fn run(args: MonitorArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let session = conn.open()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0u64;
    while running.load(Ordering::SeqCst) {
        let sample = if args.analog {
            let value = session
                .bridge
                .analog()
                .analog_read(args.pin)
                .map_err(|err| periph_error("analog read failed", err))?;
            Sample {
                pin: args.pin,
                kind: "analog",
                value,
                timestamp: now_unix_millis(),
            }
        } else {
            let level = session
                .bridge
                .gpio()
                .digital_read(args.pin)
                .map_err(|err| periph_error("digital read failed", err))?;
            Sample {
                pin: args.pin,
                kind: "digital",
                value: u16::from(u8::from(level)),
                timestamp: now_unix_millis(),
            }
        };

        print_record(&sample, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
        thread::sleep(args.interval);
    }

    session.bridge.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
