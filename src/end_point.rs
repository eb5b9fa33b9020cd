use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use bytes::{BufMut, BytesMut};
use tracing::{debug, info, trace};

use crate::clock::{Clock, MonotonicClock};
use crate::config::EndpointConfig;
use crate::control_messages::ControlMessage;
use crate::packet_header::{PacketHeader, PacketKind};
use crate::retransmit_cache::RetransmitCache;
use crate::sequence::SequenceNumber;
use crate::socket::{DatagramSocket, UdpDatagramSocket};

/// ping = PING_SMOOTHING * old + (1 - PING_SMOOTHING) * sample
const PING_SMOOTHING: f64 = 0.1;

/// a reliable packet is retransmitted once it has been in flight longer than
///  this multiple of the smoothed RTT
const RETRANSMIT_GRACE: f64 = 1.1;

/// Liveness of the link. `Connected` from the first datagram that passes the
///  protocol filter, back to `Disconnected` when the inbound silence exceeds
///  the configured timeout.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// EndPoint is the place where all other parts of the protocol come together:
///  it owns the datagram socket, frames and sequences outbound messages,
///  filters and orders inbound ones, and keeps the link alive with periodic
///  pings.
///
/// One endpoint talks to exactly one remote peer. It has no thread of its
///  own: [`EndPoint::poll_receive`] must be called regularly (typically once
///  per application tick), since that is where keep-alives, acks,
///  retransmissions and the liveness timeout are driven.
pub struct EndPoint {
    config: EndpointConfig,
    peer_addr: SocketAddr,
    socket: Arc<dyn DatagramSocket>,
    clock: Arc<dyn Clock>,

    /// seconds, converted once from the config durations
    timeout: f64,
    ping_interval: f64,

    send_buf: BytesMut,
    recv_buf: Vec<u8>,
    cache: RetransmitCache,

    /// highest reliable sequence number sent; pre-incremented, so the first
    ///  reliable packet carries 1
    last_snd_rel: SequenceNumber,
    /// next unreliable sequence number to send; post-incremented, so the
    ///  first unreliable packet carries 0
    last_snd_urel: SequenceNumber,
    /// highest reliable sequence number the peer has acknowledged
    last_ack_rel: SequenceNumber,
    /// highest in-order reliable sequence number received
    last_rec_rel: SequenceNumber,
    /// highest unreliable sequence number received, `None` until the first
    ///  one is accepted
    last_rec_urel: Option<SequenceNumber>,

    state: ConnectionState,
    /// smoothed RTT in seconds, `None` until the first pong arrives
    ping: Option<f64>,
    last_recv_time: f64,
    last_ping_time: f64,
}

impl EndPoint {
    /// Binds a non-blocking UDP socket on the configured listen port and
    ///  wires the endpoint up with the wall clock.
    pub fn new(config: EndpointConfig) -> anyhow::Result<EndPoint> {
        let socket = UdpDatagramSocket::bind(config.listen_port)?;
        Self::from_parts(config, Arc::new(socket), Arc::new(MonotonicClock::new()))
    }

    /// Builds an endpoint on top of an externally created socket and clock.
    pub fn from_parts(
        config: EndpointConfig,
        socket: Arc<dyn DatagramSocket>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<EndPoint> {
        config.validate()?;
        let peer_addr = resolve_peer(&config.peer_host, config.peer_port)?;

        info!("initializing link endpoint {:?} -> {:?}", socket.local_addr(), peer_addr);

        Ok(EndPoint {
            peer_addr,
            timeout: config.timeout.as_secs_f64(),
            ping_interval: config.ping_interval.as_secs_f64(),
            send_buf: BytesMut::with_capacity(config.buffer_size),
            recv_buf: vec![0; config.buffer_size],
            cache: RetransmitCache::new(config.cache_capacity),
            config,
            socket,
            clock,
            last_snd_rel: SequenceNumber::ZERO,
            last_snd_urel: SequenceNumber::ZERO,
            last_ack_rel: SequenceNumber::ZERO,
            last_rec_rel: SequenceNumber::ZERO,
            last_rec_urel: None,
            state: ConnectionState::Disconnected,
            ping: None,
            last_recv_time: 0.0,
            last_ping_time: 0.0,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Smoothed round-trip time in seconds, once at least one ping has made
    ///  it there and back.
    pub fn ping(&self) -> Option<f64> {
        self.ping
    }

    /// Frames and sends one application message, fire-and-forget. Reliable
    ///  messages are additionally retained for retransmission until the peer
    ///  acknowledges them.
    ///
    /// At most `cache_capacity` reliable messages may be unacknowledged at a
    ///  time; sending past that bound silently corrupts retransmission state
    ///  for the packets still in flight.
    ///
    /// Panics if the message does not fit a frame (`buffer_size - 8` bytes).
    pub fn send(&mut self, message: &[u8], reliable: bool) {
        self.send_frame(message, reliable, false);
    }

    fn send_control(&mut self, message: &ControlMessage) {
        let mut payload = [0u8; ControlMessage::SERIALIZED_LEN];
        {
            let mut w: &mut [u8] = &mut payload;
            message.ser(&mut w);
        }
        self.send_frame(&payload, false, true);
    }

    fn send_frame(&mut self, payload: &[u8], reliable: bool, control: bool) {
        assert!(
            payload.len() + PacketHeader::SERIALIZED_LEN <= self.config.buffer_size,
            "payload of {} bytes exceeds the frame budget of {}",
            payload.len(),
            self.config.max_payload_len(),
        );

        let packet_kind = PacketKind::from_flags(reliable, control);
        let sequence_number = if reliable {
            self.last_snd_rel = self.last_snd_rel.next();
            self.last_snd_rel
        } else {
            let sequence_number = self.last_snd_urel;
            self.last_snd_urel = self.last_snd_urel.next();
            sequence_number
        };

        self.send_buf.clear();
        PacketHeader::new(packet_kind, sequence_number).ser(&mut self.send_buf);
        self.send_buf.put_slice(payload);

        if reliable {
            self.cache.store(sequence_number, self.clock.now(), &self.send_buf);
        }

        trace!(
            "sending {:?} packet #{} ({} bytes)",
            packet_kind,
            sequence_number,
            self.send_buf.len(),
        );
        self.socket.send_packet(self.peer_addr, &self.send_buf);
    }

    /// Drives the link and hands out at most one application message per
    ///  call, returning its length, or 0 when this call delivered nothing.
    ///
    /// Must be called regularly: keep-alive pings, ack processing, the
    ///  retransmission of overdue reliable packets and the liveness timeout
    ///  all happen inside this call.
    ///
    /// Panics if `out` cannot hold a maximum-size payload
    ///  (`buffer_size - 8` bytes).
    pub fn poll_receive(&mut self, out: &mut [u8]) -> usize {
        assert!(
            out.len() >= self.config.max_payload_len(),
            "output buffer of {} bytes cannot hold a payload of up to {} bytes",
            out.len(),
            self.config.max_payload_len(),
        );

        let now = self.clock.now();

        // the keep-alive doubles as the ack carrier
        if now - self.last_ping_time > self.ping_interval {
            self.send_control(&ControlMessage::Ping {
                timestamp: now,
                cumulative_ack: self.last_rec_rel,
            });
            self.last_ping_time = now;
        }

        while let Some((num_read, _from)) = self.socket.try_recv_packet(&mut self.recv_buf) {
            let header = match PacketHeader::deser(&mut &self.recv_buf[..num_read]) {
                Ok(header) => header,
                Err(e) => {
                    trace!("dropping stray or malformed datagram: {}", e);
                    continue;
                }
            };

            // every datagram that passes the protocol filter proves the peer
            // alive, whether or not its sequence number is acceptable
            self.state = ConnectionState::Connected;
            self.last_recv_time = now;

            if !self.accept_sequence_number(&header) {
                continue;
            }

            let payload = &self.recv_buf[PacketHeader::SERIALIZED_LEN..num_read];

            if header.packet_kind.is_control() {
                let mut parse_buf = payload;
                match ControlMessage::deser(&mut parse_buf) {
                    Ok(message) => self.handle_control_message(message, now),
                    Err(e) => {
                        debug!(
                            "dropping control packet #{} with undecodable payload: {}",
                            header.sequence_number, e,
                        );
                    }
                }
                continue;
            }

            out[..payload.len()].copy_from_slice(payload);
            trace!(
                "delivering {:?} packet #{} ({} bytes)",
                header.packet_kind,
                header.sequence_number,
                payload.len(),
            );
            return payload.len();
        }

        // nothing delivered this call: check liveness, then nudge the oldest
        // unacknowledged reliable packet
        if now - self.last_recv_time > self.timeout {
            debug!("no inbound traffic for {:.1}s - resetting the link", now - self.last_recv_time);
            self.reset();
        } else if self.last_snd_rel != self.last_ack_rel {
            self.maybe_retransmit(now);
        }

        0
    }

    /// Drops all sequencing, liveness and RTT state. The retransmit cache is
    ///  left alone; new reliable sends overwrite its stale entries.
    ///
    /// There is no reconnection handshake: both peers are expected to reach
    ///  this state together, each through its own timeout.
    pub fn reset(&mut self) {
        debug!("resetting link state");

        self.last_snd_rel = SequenceNumber::ZERO;
        self.last_snd_urel = SequenceNumber::ZERO;
        self.last_ack_rel = SequenceNumber::ZERO;
        self.last_rec_rel = SequenceNumber::ZERO;
        self.last_rec_urel = None;

        self.state = ConnectionState::Disconnected;
        self.ping = None;
        self.last_recv_time = 0.0;
        self.last_ping_time = 0.0;
    }

    /// Reliable packets are accepted strictly in order; a gap means the
    ///  packet is dropped and the sender keeps retransmitting from the gap
    ///  onward. Unreliable packets (control included) only have to be newer
    ///  than the last accepted one.
    fn accept_sequence_number(&mut self, header: &PacketHeader) -> bool {
        if header.packet_kind.is_reliable() {
            if header.sequence_number == self.last_rec_rel.next() {
                self.last_rec_rel = header.sequence_number;
                true
            } else {
                debug!(
                    "dropping out-of-order reliable packet #{} (expecting #{})",
                    header.sequence_number,
                    self.last_rec_rel.next(),
                );
                false
            }
        } else {
            let newer = match self.last_rec_urel {
                None => true,
                Some(last) => header.sequence_number.is_after(last),
            };
            if newer {
                self.last_rec_urel = Some(header.sequence_number);
                true
            } else {
                trace!("dropping stale unreliable packet #{}", header.sequence_number);
                false
            }
        }
    }

    fn handle_control_message(&mut self, message: ControlMessage, now: f64) {
        match message {
            ControlMessage::Ping { timestamp, cumulative_ack } => {
                // a single ack value acknowledges every reliable packet up to
                // it, possibly freeing several cache slots at once
                if cumulative_ack.is_after(self.last_ack_rel) {
                    trace!("cumulative ack advances #{} -> #{}", self.last_ack_rel, cumulative_ack);
                    self.last_ack_rel = cumulative_ack;
                }
                self.send_control(&ControlMessage::Pong { timestamp });
            }
            ControlMessage::Pong { timestamp } => {
                let sample = now - timestamp;
                let smoothed = match self.ping {
                    // don't smooth the first sample
                    None => sample,
                    Some(old) => PING_SMOOTHING * old + (1.0 - PING_SMOOTHING) * sample,
                };
                trace!("RTT sample {:.4}s, smoothed ping {:.4}s", sample, smoothed);
                self.ping = Some(smoothed);
            }
        }
    }

    /// Retransmits the oldest unacknowledged reliable packet once it has been
    ///  in flight for more than `RETRANSMIT_GRACE` RTTs. Only that one packet
    ///  is re-sent per poll; later ones follow as the ack frontier advances.
    ///  Pacing needs a measured RTT, so nothing is re-sent before the first
    ///  pong.
    ///
    /// The cached send time is not refreshed here, so the same packet keeps
    ///  being re-sent on every poll until it is acknowledged.
    fn maybe_retransmit(&self, now: f64) {
        let Some(ping) = self.ping else {
            return;
        };

        let oldest_unacked = self.last_ack_rel.next();
        let Some(entry) = self.cache.get(oldest_unacked) else {
            return;
        };

        if now - entry.send_time > ping * RETRANSMIT_GRACE {
            debug!("reliable packet #{} is overdue - retransmitting", oldest_unacked);
            self.socket.send_packet(self.peer_addr, entry.frame());
        }
    }
}

fn resolve_peer(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("could not resolve peer address {}:{}", host, port))?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| anyhow!("peer {}:{} did not resolve to an IPv4 address", host, port))
}
