use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use ardubridge_frame::FramedLink;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::command::{Command, ReplyLayout, Terminator};
use crate::error::Result;

/// One board connection shared by every peripheral facade.
///
/// A single lock covers the whole request/reply round trip, so two threads
/// can never have commands in flight at the same time and every reply is
/// read by the thread that sent the matching request.
///
/// The device name and open/closed state are kept outside the lock, so
/// they stay readable while another thread waits out a reconnect.
pub struct CommandChannel {
    link: Mutex<FramedLink>,
    device: String,
    open: AtomicBool,
}

impl CommandChannel {
    pub fn new(link: FramedLink) -> Self {
        Self {
            device: link.describe(),
            open: AtomicBool::new(link.is_open()),
            link: Mutex::new(link),
        }
    }

    /// Start an exchange. The board is reserved until the guard drops.
    pub fn lock(&self) -> Exchange<'_> {
        Exchange {
            link: self
                .link
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }

    /// Run one command as a complete exchange.
    pub fn exchange(&self, command: &Command) -> Result<Bytes> {
        self.lock().transact(command)
    }

    pub fn open(&self) -> Result<()> {
        let mut exchange = self.lock();
        exchange.link.open()?;
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn close(&self) {
        let mut exchange = self.lock();
        exchange.link.close();
        self.open.store(false, Ordering::SeqCst);
    }

    /// Never waits for the exchange lock.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Device description, for logs and CLI output.
    pub fn describe(&self) -> &str {
        &self.device
    }

    /// Resynchronise with the firmware: send RESET, then discard whatever
    /// the board still had queued. Returns the number of discarded bytes.
    pub fn reset(&self) -> Result<usize> {
        let mut exchange = self.lock();
        exchange.send_reset()?;
        let discarded = exchange.drain()?;
        info!(discarded, "channel reset");
        Ok(discarded)
    }
}

impl std::fmt::Debug for CommandChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Formatting must not block: the caller may hold the exchange.
        f.debug_struct("CommandChannel")
            .field("device", &self.device)
            .field("open", &self.is_open())
            .field("busy", &self.link.try_lock().is_err())
            .finish()
    }
}

/// Exclusive access to the board for one logical exchange.
///
/// `send` and `receive` are only reachable through this guard, which keeps
/// each request paired with its own reply. Multi-step sequences (a register
/// select, a delay, then a read) hold one guard across all steps.
pub struct Exchange<'a> {
    link: MutexGuard<'a, FramedLink>,
}

impl Exchange<'_> {
    /// Write an escaped request frame.
    pub fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.link.write_frame(frame).map_err(Into::into)
    }

    /// Write a raw RESET byte.
    pub fn send_reset(&mut self) -> Result<()> {
        self.link.send_reset().map_err(Into::into)
    }

    /// Read exactly `n` reply bytes.
    pub fn receive(&mut self, n: usize) -> Result<Bytes> {
        self.link.read_frame(n).map_err(Into::into)
    }

    /// Read a count byte, then that many bytes.
    pub fn receive_counted(&mut self) -> Result<Bytes> {
        let count = self.receive(1)?;
        self.receive(usize::from(count[0]))
    }

    /// Discard pending input.
    pub fn drain(&mut self) -> Result<usize> {
        self.link.drain().map_err(Into::into)
    }

    /// Send `command` and read the reply its descriptor specifies.
    pub fn transact(&mut self, command: &Command) -> Result<Bytes> {
        let desc = command.descriptor();

        self.send(command.bytes())?;
        if desc.terminator == Terminator::Reset {
            self.send_reset()?;
        }

        let reply = match desc.reply {
            ReplyLayout::None => Ok(Bytes::new()),
            ReplyLayout::Counted => self.receive_counted(),
            ReplyLayout::StatusThenCounted => self.receive(1).and_then(|status| {
                let data = self.receive_counted()?;
                let mut out = BytesMut::with_capacity(1 + data.len());
                out.put_slice(&status);
                out.put_slice(&data);
                Ok(out.freeze())
            }),
            ReplyLayout::Fixed(_) | ReplyLayout::Operand(_) | ReplyLayout::Echo => {
                let len = command.reply_len().unwrap_or(0);
                self.receive(len)
            }
        };

        match &reply {
            Ok(bytes) => debug!(
                command = desc.name,
                request = command.bytes().len(),
                reply = bytes.len(),
                "exchange complete"
            ),
            Err(err) => warn!(command = desc.name, error = %err, "exchange failed"),
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ardubridge_frame::{escape_to_vec, LinkConfig, RESET};
    use ardubridge_transport::MemoryDevice;

    use super::*;
    use crate::error::ChannelError;

    fn fast_config() -> LinkConfig {
        LinkConfig {
            byte_timeout: Duration::from_millis(2),
            byte_attempts: 5,
            escape_timeout: Duration::from_millis(20),
            escape_poll: Duration::from_millis(5),
            reconnect_backoff: Duration::from_millis(1),
            reconnect_attempts: Some(2),
            drain_timeout: Duration::from_millis(200),
        }
    }

    fn open_channel(device: &MemoryDevice) -> CommandChannel {
        let channel = CommandChannel::new(FramedLink::with_config(device.opener(), fast_config()));
        channel.open().expect("memory channel should open");
        channel
    }

    #[test]
    fn escaped_value_byte_on_the_wire() {
        let device = MemoryDevice::with_responder(|_| vec![1]);
        let channel = open_channel(&device);

        channel.exchange(&Command::digital_write(3, 0x1B)).unwrap();

        assert_eq!(device.wire(), vec![b'O', 3, 0x5C, 0xB1]);
    }

    #[test]
    fn fixed_reply_is_returned_whole() {
        let device = MemoryDevice::with_responder(|_| vec![0x34, 0x12]);
        let channel = open_channel(&device);

        let reply = channel.exchange(&Command::analog_read(0)).unwrap();
        assert_eq!(reply.as_ref(), &[0x34, 0x12]);
    }

    #[test]
    fn counted_reply_strips_count() {
        let device = MemoryDevice::with_responder(|_| vec![3, 7, 8, 9]);
        let channel = open_channel(&device);

        let reply = channel.exchange(&Command::i2c_read(0x20, 3)).unwrap();
        assert_eq!(reply.as_ref(), &[7, 8, 9]);
    }

    #[test]
    fn status_then_counted_keeps_status() {
        let device = MemoryDevice::with_responder(|_| vec![b'N', 2, 0xAA, 0xBB]);
        let channel = open_channel(&device);

        let reply = channel
            .exchange(&Command::i2c_write_read(0x20, 0x01, 2))
            .unwrap();
        assert_eq!(reply.as_ref(), &[b'N', 0xAA, 0xBB]);
    }

    #[test]
    fn reset_terminated_command_writes_raw_reset() {
        let device = MemoryDevice::with_responder(|written| {
            if written == [RESET] {
                vec![0xA0, 0xB0]
            } else {
                Vec::new()
            }
        });
        let channel = open_channel(&device);

        let reply = channel.exchange(&Command::spi_transfer(&[0x5C, 0x01]).unwrap()).unwrap();

        assert_eq!(reply.as_ref(), &[0xA0, 0xB0]);
        let writes = device.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].bytes, vec![b'3', 0x5C, 0xC5, 0x01]);
        assert_eq!(writes[1].bytes, vec![RESET]);
    }

    #[test]
    fn no_reply_command_does_not_wait() {
        let device = MemoryDevice::new();
        let channel = open_channel(&device);

        let reply = channel.exchange(&Command::led_write(&[0xFF])).unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn escaped_reply_bytes_are_decoded() {
        let device = MemoryDevice::with_responder(|_| escape_to_vec(&[0x1B, 0x5C]));
        let channel = open_channel(&device);

        let reply = channel.exchange(&Command::analog_read(1)).unwrap();
        assert_eq!(reply.as_ref(), &[0x1B, 0x5C]);
    }

    #[test]
    fn link_errors_map_to_channel_errors() {
        let device = MemoryDevice::new();
        let channel = open_channel(&device);
        assert!(matches!(
            channel.exchange(&Command::digital_read(1)),
            Err(ChannelError::Timeout)
        ));

        device.set_responder(|_| vec![RESET]);
        let err = channel.exchange(&Command::digital_read(1)).unwrap_err();
        assert!(matches!(err, ChannelError::UnexpectedReset));
        assert!(err.is_desync());

        channel.close();
        assert!(matches!(
            channel.exchange(&Command::digital_read(1)),
            Err(ChannelError::Closed)
        ));
    }

    #[test]
    fn reset_drains_stale_bytes() {
        let device = MemoryDevice::new();
        let channel = open_channel(&device);
        device.inject(&[1, 2, 3, 4]);

        assert_eq!(channel.reset().unwrap(), 4);
        assert_eq!(device.wire(), vec![RESET]);
        assert_eq!(device.pending_input(), 0);
    }

    #[test]
    fn debug_does_not_wait_for_held_exchange() {
        let device = MemoryDevice::new();
        let channel = open_channel(&device);

        let exchange = channel.lock();
        let text = format!("{channel:?}");
        drop(exchange);

        assert!(text.contains("\"memory\""), "{text}");
        assert!(text.contains("open: true"), "{text}");
        assert!(text.contains("busy: true"), "{text}");
        assert!(format!("{channel:?}").contains("busy: false"));
    }

    #[test]
    fn open_state_tracks_open_and_close() {
        let device = MemoryDevice::new();
        let channel = CommandChannel::new(FramedLink::with_config(device.opener(), fast_config()));
        assert!(!channel.is_open());
        assert_eq!(channel.describe(), "memory");

        device.fail_next_opens(1);
        assert!(channel.open().is_err());
        assert!(!channel.is_open());

        channel.open().unwrap();
        assert!(channel.is_open());
        channel.close();
        assert!(!channel.is_open());
    }

    #[test]
    fn guard_holds_multi_step_sequence() {
        let device = MemoryDevice::with_responder(|written| match written.first() {
            Some(b'2') if written.len() == 7 => vec![b'N'],
            Some(b'2') => vec![1, 0x42],
            _ => Vec::new(),
        });
        let channel = open_channel(&device);

        let mut exchange = channel.lock();
        let status = exchange.transact(&Command::i2c_select(0x20, 0x05)).unwrap();
        let data = exchange.transact(&Command::i2c_read_selected(1)).unwrap();
        drop(exchange);

        assert_eq!(status.as_ref(), &[b'N']);
        assert_eq!(data.as_ref(), &[0x42]);
    }
}
