use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{BridgeStream, PortOpener};

/// Baud rate the bridge firmware ships with.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Initial read timeout applied right after open; the link layer narrows it.
const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_millis(5);

/// Opens a physical serial port through `serialport`.
#[derive(Debug, Clone)]
pub struct SerialOpener {
    /// Device path (`/dev/ttyACM0`, `COM9`, ...).
    pub path: String,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Read timeout applied to the freshly opened port.
    pub timeout: Duration,
}

impl SerialOpener {
    /// Opener for `path` at `baud_rate`.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }
}

impl PortOpener for SerialOpener {
    fn open(&mut self) -> Result<Box<dyn BridgeStream>> {
        let port = serialport::new(&self.path, self.baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|err| TransportError::Open {
                path: self.path.clone(),
                source: err.into(),
            })?;
        info!(path = %self.path, baud = self.baud_rate, "serial port opened");
        Ok(Box::new(SerialStream {
            port,
            path: self.path.clone(),
        }))
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.path, self.baud_rate)
    }
}

/// A `serialport` handle exposed as a [`BridgeStream`].
struct SerialStream {
    port: Box<dyn SerialPort>,
    path: String,
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl BridgeStream for SerialStream {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|err| TransportError::Io(err.into()))
    }

    fn clear_input(&mut self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|err| TransportError::Io(err.into()))
    }

    fn name(&self) -> String {
        self.port.name().unwrap_or_else(|| self.path.clone())
    }
}

impl Drop for SerialStream {
    fn drop(&mut self) {
        debug!(path = %self.path, "serial port closed");
    }
}

/// A serial port visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    /// `usb`, `pci`, `bluetooth` or `unknown`.
    pub kind: &'static str,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// List serial ports the OS currently exposes.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports =
        serialport::available_ports().map_err(|err| TransportError::Enumerate(err.to_string()))?;

    Ok(ports
        .into_iter()
        .map(|port| match port.port_type {
            SerialPortType::UsbPort(usb) => PortInfo {
                name: port.port_name,
                kind: "usb",
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                serial_number: usb.serial_number,
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            other => PortInfo {
                name: port.port_name,
                kind: match other {
                    SerialPortType::PciPort => "pci",
                    SerialPortType::BluetoothPort => "bluetooth",
                    _ => "unknown",
                },
                vid: None,
                pid: None,
                serial_number: None,
                manufacturer: None,
                product: None,
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opener_defaults() {
        let opener = SerialOpener::new("/dev/ttyACM0", DEFAULT_BAUD_RATE);
        assert_eq!(opener.baud_rate, 115_200);
        assert_eq!(opener.timeout, DEFAULT_OPEN_TIMEOUT);
        assert_eq!(opener.describe(), "/dev/ttyACM0@115200");
    }

    #[test]
    fn open_missing_device_reports_path() {
        let mut opener = SerialOpener::new("/dev/ardubridge-does-not-exist", 230_400);
        let err = opener.open().unwrap_err();
        match err {
            TransportError::Open { path, .. } => {
                assert_eq!(path, "/dev/ardubridge-does-not-exist");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
