use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::channel::CommandChannel;
use crate::command::Command;
use crate::error::{ChannelError, Result};

/// How often to retry the open + identify sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `None` retries forever.
    pub retries: Option<u32>,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: Some(6),
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Keep trying until the board answers.
    pub fn forever() -> Self {
        Self {
            retries: None,
            ..Self::default()
        }
    }

    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries: Some(retries),
            ..Self::default()
        }
    }
}

/// Ask the firmware for its identity string.
///
/// The reply is one count byte followed by that many ASCII bytes.
pub fn identify(channel: &CommandChannel) -> Result<String> {
    let reply = channel.exchange(&Command::identify())?;
    let identity = String::from_utf8_lossy(&reply).into_owned();
    info!(%identity, "board identified");
    Ok(identity)
}

/// Open the channel and identify the board, retrying the whole sequence
/// according to `policy`.
///
/// Boards that reset on port open (most USB Arduinos) miss the first
/// queries while the bootloader runs; the retry loop covers that window.
pub fn open_and_identify(channel: &CommandChannel, policy: &RetryPolicy) -> Result<String> {
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);

        match channel.open().and_then(|()| identify(channel)) {
            Ok(identity) => return Ok(identity),
            Err(err) => {
                warn!(attempt = attempts, error = %err, "no identification reply");
                if let Some(retries) = policy.retries {
                    if attempts > retries {
                        return Err(ChannelError::Identify { attempts });
                    }
                }
            }
        }

        thread::sleep(policy.backoff);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use ardubridge_frame::{FramedLink, LinkConfig};
    use ardubridge_transport::MemoryDevice;

    use super::*;

    fn fast_channel(device: &MemoryDevice) -> CommandChannel {
        let config = LinkConfig {
            byte_timeout: Duration::from_millis(2),
            byte_attempts: 5,
            reconnect_backoff: Duration::from_millis(1),
            reconnect_attempts: Some(2),
            ..LinkConfig::default()
        };
        CommandChannel::new(FramedLink::with_config(device.opener(), config))
    }

    fn fast_policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries: Some(retries),
            backoff: Duration::from_millis(1),
        }
    }

    fn hello_after(silent: u32) -> (MemoryDevice, Arc<AtomicU32>) {
        let queries = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&queries);
        let device = MemoryDevice::with_responder(move |written| {
            if written != b"?" {
                return Vec::new();
            }
            if seen.fetch_add(1, Ordering::SeqCst) < silent {
                return Vec::new();
            }
            vec![0x05, b'H', b'E', b'L', b'L', b'O']
        });
        (device, queries)
    }

    #[test]
    fn identify_reads_counted_string() {
        let (device, _) = hello_after(0);
        let channel = fast_channel(&device);
        channel.open().unwrap();

        assert_eq!(identify(&channel).unwrap(), "HELLO");
        assert_eq!(device.wire(), vec![0x3F]);
    }

    #[test]
    fn identify_recovers_after_silent_attempts() {
        let (device, queries) = hello_after(2);
        let channel = fast_channel(&device);

        let identity = open_and_identify(&channel, &fast_policy(3)).unwrap();

        assert_eq!(identity, "HELLO");
        assert_eq!(queries.load(Ordering::SeqCst), 3);
        assert_eq!(device.open_count(), 1);
    }

    #[test]
    fn identify_gives_up_after_retries() {
        let device = MemoryDevice::new();
        let channel = fast_channel(&device);

        let err = open_and_identify(&channel, &fast_policy(2)).unwrap_err();
        assert!(matches!(err, ChannelError::Identify { attempts: 3 }));
        assert_eq!(device.writes().len(), 3);
    }

    #[test]
    fn open_failures_count_as_attempts() {
        let (device, _) = hello_after(0);
        device.fail_next_opens(2);
        let channel = fast_channel(&device);

        let identity = open_and_identify(&channel, &fast_policy(3)).unwrap();
        assert_eq!(identity, "HELLO");
        assert!(channel.is_open());
    }

    #[test]
    fn policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries, Some(6));
        assert_eq!(RetryPolicy::forever().retries, None);
        assert_eq!(RetryPolicy::with_retries(3).backoff, policy.backoff);
    }
}
