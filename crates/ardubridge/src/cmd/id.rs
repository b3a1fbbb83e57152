use serde::Serialize;

use crate::cmd::Connection;
use crate::exit::{channel_error, periph_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat, Record};

#[derive(Serialize)]
struct IdentityRecord {
    port: String,
    identity: String,
    discarded: Option<usize>,
}

impl Record for IdentityRecord {
    fn columns() -> &'static [&'static str] {
        &["port", "identity", "discarded"]
    }

    fn cells(&self) -> Vec<String> {
        let discarded = self
            .discarded
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        vec![self.port.clone(), self.identity.clone(), discarded]
    }

    fn raw(&self) -> String {
        self.identity.clone()
    }
}

pub fn run(conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let session = conn.open()?;
    print_record(
        &IdentityRecord {
            port: session.port,
            identity: session.identity,
            discarded: None,
        },
        format,
    );
    Ok(SUCCESS)
}

pub fn reset(conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let session = conn.open()?;
    let discarded = session
        .bridge
        .channel()
        .reset()
        .map_err(|err| channel_error("reset failed", err))?;
    let identity = session
        .bridge
        .identify()
        .map_err(|err| periph_error("identify after reset failed", err))?;

    print_record(
        &IdentityRecord {
            port: session.port,
            identity,
            discarded: Some(discarded),
        },
        format,
    );
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_column_has_a_cell() {
        let record = IdentityRecord {
            port: "/dev/ttyACM0".to_string(),
            identity: "ArduBridge v1".to_string(),
            discarded: Some(3),
        };

        assert_eq!(IdentityRecord::columns().len(), record.cells().len());
        assert_eq!(record.cells()[2], "3");
    }

    #[test]
    fn plain_identify_shows_no_discard_count() {
        let record = IdentityRecord {
            port: "/dev/ttyACM0".to_string(),
            identity: "ArduBridge v1".to_string(),
            discarded: None,
        };
        assert_eq!(record.cells()[2], "-");
    }
}
