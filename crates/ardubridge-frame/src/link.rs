use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use ardubridge_transport::{BridgeStream, PortOpener, TransportError};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::codec::{decode_continuation, escape, ESCAPE, RESET};
use crate::error::{LinkError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Timing and recovery parameters for a [`FramedLink`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Timeout for a single raw-byte read.
    pub byte_timeout: Duration,
    /// Raw-byte reads attempted before a logical byte is declared lost.
    pub byte_attempts: u32,
    /// Upper bound on the wait for the byte following an ESCAPE.
    pub escape_timeout: Duration,
    /// Sleep between continuation polls.
    pub escape_poll: Duration,
    /// Pause between reopen attempts after an I/O error.
    pub reconnect_backoff: Duration,
    /// Reopen attempts before giving up. `None` retries forever.
    pub reconnect_attempts: Option<u32>,
    /// Ceiling on [`FramedLink::drain`] for a board that never stops sending.
    pub drain_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            byte_timeout: Duration::from_millis(5),
            byte_attempts: 25,
            escape_timeout: Duration::from_millis(500),
            escape_poll: Duration::from_millis(100),
            reconnect_backoff: Duration::from_millis(500),
            reconnect_attempts: None,
            drain_timeout: Duration::from_secs(2),
        }
    }
}

impl LinkConfig {
    /// Worst-case wait for one logical byte outside an escape sequence.
    pub fn read_budget(&self) -> Duration {
        self.byte_timeout * self.byte_attempts.max(1)
    }
}

/// Whether the link was explicitly opened.
///
/// I/O failures never change this; they trigger a reconnect instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Closed,
    Open,
}

/// Owns one serial device and moves escaped frames over it.
pub struct FramedLink {
    opener: Box<dyn PortOpener>,
    stream: Option<Box<dyn BridgeStream>>,
    state: LinkState,
    config: LinkConfig,
    buf: BytesMut,
}

impl FramedLink {
    /// Create a closed link with default configuration.
    pub fn new(opener: impl PortOpener + 'static) -> Self {
        Self::with_config(opener, LinkConfig::default())
    }

    /// Create a closed link with explicit configuration.
    pub fn with_config(opener: impl PortOpener + 'static, config: LinkConfig) -> Self {
        Self {
            opener: Box::new(opener),
            stream: None,
            state: LinkState::Closed,
            config,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Open the device. Opening an open link is a no-op.
    pub fn open(&mut self) -> Result<()> {
        if self.state == LinkState::Open {
            return Ok(());
        }

        let stream = self.opener.open().map_err(LinkError::DeviceUnavailable)?;
        self.install(stream)?;
        self.state = LinkState::Open;
        info!(device = %self.opener.describe(), "link open");
        Ok(())
    }

    /// Close the device. Idempotent.
    pub fn close(&mut self) {
        self.stream = None;
        if self.state == LinkState::Open {
            info!(device = %self.opener.describe(), "link closed");
        }
        self.state = LinkState::Closed;
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Device description from the opener.
    pub fn describe(&self) -> String {
        self.opener.describe()
    }

    /// Send one raw RESET byte so the firmware drops any partial frame.
    pub fn send_reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        debug!("sending RESET");
        self.write_raw(&[RESET])
    }

    /// Escape `payload` and write it.
    ///
    /// Unread input is discarded first: anything still buffered belongs to
    /// an exchange that already failed.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.clear_input()?;

        let mut wire = std::mem::take(&mut self.buf);
        wire.clear();
        escape(payload, &mut wire);
        let result = self.write_raw(&wire);
        self.buf = wire;

        if result.is_ok() {
            debug!(len = payload.len(), "frame sent");
        }
        result
    }

    /// Read exactly `n` unescaped bytes.
    ///
    /// Fails atomically: no partial frame is ever returned.
    pub fn read_frame(&mut self, n: usize) -> Result<Bytes> {
        self.ensure_open()?;

        let mut out = BytesMut::with_capacity(n);
        while out.len() < n {
            let Some(byte) = self.read_byte()? else {
                warn!(
                    expected = n,
                    received = out.len(),
                    budget = ?self.config.read_budget(),
                    "reply timed out"
                );
                return Err(LinkError::Timeout);
            };

            match byte {
                RESET => {
                    warn!(expected = n, received = out.len(), "RESET received mid-frame");
                    return Err(LinkError::UnexpectedReset);
                }
                ESCAPE => {
                    let next = self.read_continuation()?;
                    out.put_u8(decode_continuation(next)?);
                }
                other => out.put_u8(other),
            }
        }

        Ok(out.freeze())
    }

    /// Discard raw input until a whole read budget passes in silence.
    /// Returns the byte count.
    ///
    /// Fails with [`LinkError::Timeout`] if input is still arriving after
    /// `drain_timeout`.
    pub fn drain(&mut self) -> Result<usize> {
        self.ensure_open()?;
        let deadline = Instant::now() + self.config.drain_timeout;
        let mut discarded = 0usize;
        while self.read_byte()?.is_some() {
            discarded += 1;
            if Instant::now() >= deadline {
                warn!(
                    discarded,
                    timeout = ?self.config.drain_timeout,
                    "input never went quiet"
                );
                return Err(LinkError::Timeout);
            }
        }
        if discarded > 0 {
            debug!(discarded, "drained stale input");
        }
        Ok(discarded)
    }

    /// Drop the current stream and reopen the device.
    ///
    /// Blocks until the device is back, or until `reconnect_attempts` is
    /// exhausted.
    pub fn reconnect(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.stream = None;

        let device = self.opener.describe();
        let mut attempt = 0u32;
        loop {
            attempt = attempt.saturating_add(1);
            // A port that opens but cannot be configured counts as a failed
            // attempt, same as one that does not open.
            let failure = match self.opener.open() {
                Ok(stream) => match self.install(stream) {
                    Ok(()) => {
                        info!(%device, attempt, "link re-established");
                        return Ok(());
                    }
                    Err(err) => err,
                },
                Err(err) => LinkError::DeviceUnavailable(err),
            };

            warn!(%device, attempt, error = %failure, "device unreachable, retrying");
            if let Some(max) = self.config.reconnect_attempts {
                if attempt >= max {
                    return Err(failure);
                }
            }
            thread::sleep(self.config.reconnect_backoff);
        }
    }

    fn install(&mut self, mut stream: Box<dyn BridgeStream>) -> Result<()> {
        stream.set_timeout(self.config.byte_timeout)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            LinkState::Open => Ok(()),
            LinkState::Closed => Err(LinkError::Closed),
        }
    }

    fn stream_mut(&mut self) -> Result<&mut Box<dyn BridgeStream>> {
        self.ensure_open()?;
        if self.stream.is_none() {
            // A previous bounded reconnect gave up; try again.
            self.reconnect()?;
        }
        self.stream.as_mut().ok_or(LinkError::Closed)
    }

    fn reconnect_after(&mut self, cause: std::io::Error) -> Result<()> {
        warn!(device = %self.opener.describe(), error = %cause, "link I/O error, reconnecting");
        self.reconnect().map_err(|_| LinkError::Io(cause))
    }

    fn clear_input(&mut self) -> Result<()> {
        let stream = self.stream_mut()?;
        match stream.clear_input() {
            Ok(()) => Ok(()),
            Err(TransportError::Io(err)) => self.reconnect_after(err),
            Err(other) => Err(other.into()),
        }
    }

    fn write_raw(&mut self, wire: &[u8]) -> Result<()> {
        loop {
            let stream = self.stream_mut()?;
            match stream.write_all(wire).and_then(|()| stream.flush()) {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::TimedOut => {
                    warn!(len = wire.len(), "write timed out");
                    return Err(LinkError::Timeout);
                }
                Err(err) => self.reconnect_after(err)?,
            }
        }
    }

    /// One logical attempt: up to `byte_attempts` raw reads.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        for _ in 0..self.config.byte_attempts.max(1) {
            if let Some(byte) = self.poll_byte()? {
                return Ok(Some(byte));
            }
        }
        Ok(None)
    }

    /// One raw read bounded by `byte_timeout`.
    fn poll_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        let stream = self.stream_mut()?;
        match stream.read(&mut byte) {
            Ok(1) => Ok(Some(byte[0])),
            Ok(_) => {
                // End of stream: the device went away without an error.
                self.reconnect_after(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "serial stream reported end of file",
                ))?;
                Ok(None)
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(err) => {
                self.reconnect_after(err)?;
                Ok(None)
            }
        }
    }

    /// The byte after an ESCAPE. A half-received pair is not abandoned on
    /// the normal budget, but is still bounded by `escape_timeout`.
    fn read_continuation(&mut self) -> Result<u8> {
        let deadline = Instant::now() + self.config.escape_timeout;
        loop {
            if let Some(byte) = self.read_byte()? {
                return Ok(byte);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(timeout = ?self.config.escape_timeout, "escape continuation never arrived");
                return Err(LinkError::IncompleteEscape);
            }
            thread::sleep(self.config.escape_poll.min(deadline - now));
        }
    }
}

impl std::fmt::Debug for FramedLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedLink")
            .field("device", &self.opener.describe())
            .field("state", &self.state)
            .field("config", &self.config)
            .finish()
    }
}
