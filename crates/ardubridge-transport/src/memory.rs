//! In-process emulated bridge board.
//!
//! A [`MemoryDevice`] stands in for a serial port with firmware behind it.
//! Every chunk the host writes is recorded and handed to a responder
//! closure, whose return value is queued as bytes for the host to read.
//! Faults (failed opens, hard read/write errors, stale input) can be
//! injected to exercise recovery paths without hardware.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use crate::error::{Result, TransportError};
use crate::traits::{BridgeStream, PortOpener};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

/// One `write` call observed on the emulated wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireWrite {
    /// Thread that issued the write.
    pub thread: ThreadId,
    /// Raw (already escaped) bytes.
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct DeviceState {
    rx: VecDeque<u8>,
    writes: Vec<WireWrite>,
    responder: Option<Responder>,
    fail_opens: u32,
    fail_reads: u32,
    fail_writes: u32,
    fail_timeouts: u32,
    eof_reads: u32,
    opens: u32,
}

struct Shared {
    state: Mutex<DeviceState>,
    readable: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle to an emulated board. Clones share the same device.
#[derive(Clone)]
pub struct MemoryDevice {
    shared: Arc<Shared>,
}

impl Default for MemoryDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDevice {
    /// A silent device: writes are recorded, nothing is ever answered.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(DeviceState::default()),
                readable: Condvar::new(),
            }),
        }
    }

    /// A device that answers every written chunk with `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        let device = Self::new();
        device.set_responder(responder);
        device
    }

    /// Replace the responder.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        self.shared.lock().responder = Some(Box::new(responder));
    }

    /// An opener producing streams onto this device.
    pub fn opener(&self) -> MemoryOpener {
        MemoryOpener {
            device: self.clone(),
        }
    }

    /// Queue raw bytes as if the board had sent them unprompted.
    pub fn inject(&self, bytes: &[u8]) {
        self.shared.lock().rx.extend(bytes.iter().copied());
        self.shared.readable.notify_all();
    }

    /// Bytes sent by the board and not yet read by the host.
    pub fn pending_input(&self) -> usize {
        self.shared.lock().rx.len()
    }

    /// Every write observed so far.
    pub fn writes(&self) -> Vec<WireWrite> {
        self.shared.lock().writes.clone()
    }

    /// All written bytes, concatenated in wire order.
    pub fn wire(&self) -> Vec<u8> {
        self.shared
            .lock()
            .writes
            .iter()
            .flat_map(|w| w.bytes.iter().copied())
            .collect()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.shared.lock().writes.clear();
    }

    /// Make the next `n` open attempts fail.
    pub fn fail_next_opens(&self, n: u32) {
        self.shared.lock().fail_opens = n;
    }

    /// Make the next `n` reads fail with a hard I/O error.
    pub fn fail_next_reads(&self, n: u32) {
        self.shared.lock().fail_reads = n;
        self.shared.readable.notify_all();
    }

    /// Make the next `n` writes fail with a hard I/O error.
    pub fn fail_next_writes(&self, n: u32) {
        self.shared.lock().fail_writes = n;
    }

    /// Make the next `n` `set_timeout` calls fail, as a port that vanishes
    /// between open and configuration does.
    pub fn fail_next_timeouts(&self, n: u32) {
        self.shared.lock().fail_timeouts = n;
    }

    /// Make the next `n` reads report end of stream (`Ok(0)`).
    pub fn eof_next_reads(&self, n: u32) {
        self.shared.lock().eof_reads = n;
        self.shared.readable.notify_all();
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> u32 {
        self.shared.lock().opens
    }
}

/// [`PortOpener`] for a [`MemoryDevice`].
pub struct MemoryOpener {
    device: MemoryDevice,
}

impl PortOpener for MemoryOpener {
    fn open(&mut self) -> Result<Box<dyn BridgeStream>> {
        let mut state = self.device.shared.lock();
        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            return Err(TransportError::Open {
                path: self.describe(),
                source: std::io::Error::new(ErrorKind::NotFound, "emulated device unplugged"),
            });
        }
        state.opens += 1;
        Ok(Box::new(MemoryStream {
            shared: Arc::clone(&self.device.shared),
            timeout: Duration::from_millis(5),
        }))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

struct MemoryStream {
    shared: Arc<Shared>,
    timeout: Duration,
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = Instant::now() + self.timeout;
        let mut state = self.shared.lock();
        loop {
            if state.fail_reads > 0 {
                state.fail_reads -= 1;
                return Err(std::io::Error::new(
                    ErrorKind::BrokenPipe,
                    "emulated read failure",
                ));
            }

            if state.eof_reads > 0 {
                state.eof_reads -= 1;
                return Ok(0);
            }

            if !state.rx.is_empty() {
                let n = buf.len().min(state.rx.len());
                for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(std::io::Error::new(ErrorKind::TimedOut, "read timed out"));
            }
            state = self
                .shared
                .readable
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut state = self.shared.lock();
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "emulated write failure",
            ));
        }

        state.writes.push(WireWrite {
            thread: std::thread::current().id(),
            bytes: buf.to_vec(),
        });

        let reply = match state.responder.as_mut() {
            Some(responder) => responder(buf),
            None => Vec::new(),
        };
        if !reply.is_empty() {
            state.rx.extend(reply);
            self.shared.readable.notify_all();
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl BridgeStream for MemoryStream {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        let mut state = self.shared.lock();
        if state.fail_timeouts > 0 {
            state.fail_timeouts -= 1;
            return Err(TransportError::Io(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "emulated configuration failure",
            )));
        }
        self.timeout = timeout;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.shared.lock().rx.clear();
        Ok(())
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}
