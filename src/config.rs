use std::time::Duration;

use anyhow::bail;

use crate::control_messages::ControlMessage;
use crate::packet_header::PacketHeader;

/// Static configuration of a link endpoint. Immutable once the endpoint is
///  constructed.
#[derive(Clone, Debug)]
pub struct EndpointConfig {
    /// Host name or IP address of the single remote peer. Resolved once, at
    ///  endpoint construction, to an IPv4 address.
    pub peer_host: String,
    pub peer_port: u16,

    /// Local UDP port to bind for receiving; the endpoint listens on all
    ///  interfaces.
    pub listen_port: u16,

    /// Inbound silence after which the link is considered dead and the
    ///  endpoint resets itself to `Disconnected`.
    pub timeout: Duration,

    /// Interval between outbound keep-alive pings. Pings also carry the
    ///  cumulative ack, so this is effectively the ack frequency as well.
    pub ping_interval: Duration,

    /// Maximum framed datagram size, header included. The largest
    ///  application payload is `buffer_size - 8`.
    ///
    /// This is also the size this endpoint assumes for inbound datagrams;
    ///  both peers must agree on it. Choosing it above the path MTU causes
    ///  IP fragmentation, which this protocol does not attempt to detect or
    ///  compensate for.
    pub buffer_size: usize,

    /// Number of reliable outbound frames retained for retransmission. At
    ///  most this many reliable packets may be unacknowledged at any time;
    ///  sending beyond that silently corrupts retransmission state.
    pub cache_capacity: usize,
}

impl EndpointConfig {
    /// A config with the defaults the protocol was tuned with: 10s timeout,
    ///  1s keep-alive interval, 1 KiB frames, a 32-packet retransmit window.
    pub fn new(peer_host: impl Into<String>, peer_port: u16, listen_port: u16) -> EndpointConfig {
        EndpointConfig {
            peer_host: peer_host.into(),
            peer_port,
            listen_port,
            timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(1),
            buffer_size: 1024,
            cache_capacity: 32,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.buffer_size < PacketHeader::SERIALIZED_LEN + ControlMessage::SERIALIZED_LEN {
            bail!(
                "buffer size {} cannot hold a framed control message ({} bytes)",
                self.buffer_size,
                PacketHeader::SERIALIZED_LEN + ControlMessage::SERIALIZED_LEN,
            );
        }
        if self.cache_capacity == 0 {
            bail!("retransmit cache capacity must be at least 1");
        }
        if self.ping_interval.is_zero() {
            bail!("ping interval must be positive");
        }
        if self.timeout <= self.ping_interval {
            bail!(
                "timeout {:?} must exceed the ping interval {:?}, or the link resets between keep-alives",
                self.timeout,
                self.ping_interval,
            );
        }
        Ok(())
    }

    /// Largest application payload that fits a framed datagram.
    pub fn max_payload_len(&self) -> usize {
        self.buffer_size - PacketHeader::SERIALIZED_LEN
    }
}
