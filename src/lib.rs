//! A point-to-point message link over UDP that offers a reliable and an
//!  unreliable delivery mode side by side, trading the generality of TCP for
//!  a tiny, predictable, poll-driven core.
//!
//! ## Design goals
//!
//! * One endpoint talks to exactly one remote peer over a single UDP socket;
//!   there is no connection handshake and no server/client asymmetry
//! * The abstraction is sending / receiving *messages* (defined-length chunks
//!   of data, one per datagram) rather than a byte stream
//! * Two delivery modes per message, chosen at send time:
//!   * *reliable*: delivered exactly once, in send order, retransmitted until
//!     acknowledged
//!   * *unreliable*: delivered at most once, duplicates and late stragglers
//!     are dropped, nothing is ever re-sent
//! * No threads, no callbacks: the application polls the endpoint, typically
//!   once per tick, and everything - keep-alive, acks, retransmission,
//!   timeout - happens inside that poll
//! * Liveness is piggybacked on a periodic ping/pong exchange that also
//!   measures a smoothed round-trip time and carries the cumulative ack
//! * Stray traffic hitting the port is filtered out by a protocol id in
//!   every header
//!
//! Deliberately out of scope: ordering between the reliable and unreliable
//!  streams, fragmentation of messages larger than one frame, encryption,
//!  congestion control, and more than one peer per endpoint.
//!
//! ## Wire format
//!
//! Every datagram starts with the same 8-byte header; all numbers are
//!  little-endian:
//!
//! ```ascii
//! 0: tagged protocol id (u32) = (0x5044554B & 0xFFFFFFF0) | flags
//!     * bit 0: reliable
//!     * bit 1: control
//!     * bits 2-3: reserved, zero
//! 4: sequence number (u32)
//! 8: payload
//! ```
//!
//! Reliable and unreliable packets count in two independent sequence spaces,
//!  both starting at zero and wrapping modulo 2^32. Control packets share
//!  the unreliable space. A received unreliable sequence number is accepted
//!  if it lies in the forward quarter (2^30) of the sequence space relative
//!  to the previously accepted one; a reliable packet only if it is exactly
//!  the successor of the last delivered one - gaps are left for the sender
//!  to retransmit.
//!
//! ## Control messages
//!
//! Control packets carry a 13-byte payload consumed by the transport itself:
//!
//! ```ascii
//! Ping: 0x00, timestamp (f64), cumulative ack (u32)
//! Pong: 0x01, echoed timestamp (f64), ignored (u32)
//! ```
//!
//! A ping is sent whenever the configured interval has passed without one,
//!  keeping the link alive in both directions. Its cumulative ack - the
//!  sender's highest in-order received reliable sequence number - is the
//!  only ack mechanism in the protocol. The pong echoes the timestamp back
//!  verbatim, and the round-trip time derived from it paces retransmission.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rudp_link::config::EndpointConfig;
//! use rudp_link::end_point::EndPoint;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut link = EndPoint::new(EndpointConfig::new("10.0.0.17", 4711, 4711))?;
//!
//!     link.send(b"status update", false);
//!
//!     let mut buf = [0u8; 1016];
//!     loop {
//!         let len = link.poll_receive(&mut buf);
//!         if len > 0 {
//!             println!("got {:?}", &buf[..len]);
//!         }
//!         std::thread::sleep(std::time::Duration::from_millis(5));
//!     }
//! }
//! ```

mod buf_ext;
mod control_messages;
mod packet_header;
mod retransmit_cache;
mod sequence;

pub mod clock;
pub mod config;
pub mod end_point;
pub mod socket;

#[cfg(test)]
mod tests {
    use tracing::Level;

    #[ctor::ctor]
    fn init_test_logging() {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(Level::TRACE)
            .try_init()
            .ok();
    }
}
