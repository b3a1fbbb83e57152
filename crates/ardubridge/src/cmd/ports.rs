use ardubridge_transport::{available_ports, PortInfo};
use serde::Serialize;

use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_records, OutputFormat, Record};

#[derive(Serialize)]
struct PortRecord {
    name: String,
    kind: &'static str,
    vid: Option<u16>,
    pid: Option<u16>,
    serial_number: Option<String>,
    manufacturer: Option<String>,
    product: Option<String>,
}

impl From<PortInfo> for PortRecord {
    fn from(info: PortInfo) -> Self {
        Self {
            name: info.name,
            kind: info.kind,
            vid: info.vid,
            pid: info.pid,
            serial_number: info.serial_number,
            manufacturer: info.manufacturer,
            product: info.product,
        }
    }
}

impl Record for PortRecord {
    fn columns() -> &'static [&'static str] {
        &["port", "type", "vid:pid", "manufacturer", "product"]
    }

    fn cells(&self) -> Vec<String> {
        let ids = match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
            _ => "-".to_string(),
        };
        vec![
            self.name.clone(),
            self.kind.to_string(),
            ids,
            self.manufacturer.clone().unwrap_or_else(|| "-".to_string()),
            self.product.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }

    fn raw(&self) -> String {
        self.name.clone()
    }
}

pub fn run(format: OutputFormat) -> CliResult<i32> {
    let ports = available_ports().map_err(|err| transport_error("port scan failed", err))?;
    let records: Vec<PortRecord> = ports.into_iter().map(PortRecord::from).collect();
    print_records(&records, format);
    Ok(SUCCESS)
}
