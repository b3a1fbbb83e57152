use std::sync::Arc;
use std::time::Duration;

use ardubridge_channel::CommandChannel;
use ardubridge_frame::{FramedLink, LinkConfig};
use ardubridge_transport::MemoryDevice;

/// An open channel onto an emulated board answering with `responder`.
pub(crate) fn board<F>(responder: F) -> (MemoryDevice, Arc<CommandChannel>)
where
    F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
{
    let device = MemoryDevice::with_responder(responder);
    let config = LinkConfig {
        byte_timeout: Duration::from_millis(2),
        byte_attempts: 5,
        escape_timeout: Duration::from_millis(20),
        escape_poll: Duration::from_millis(5),
        reconnect_backoff: Duration::from_millis(1),
        reconnect_attempts: Some(2),
        drain_timeout: Duration::from_millis(200),
    };
    let channel = CommandChannel::new(FramedLink::with_config(device.opener(), config));
    channel.open().expect("memory channel should open");
    (device, Arc::new(channel))
}
