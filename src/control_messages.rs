use anyhow::bail;
use bytes::{Buf, BufMut};

use crate::buf_ext::BufExt;
use crate::sequence::SequenceNumber;

const KIND_PING: u8 = 0;
const KIND_PONG: u8 = 1;

/// A message consumed by the transport itself rather than the application.
///  Control messages ride in ordinary unreliable packets with the control
///  flag set.
///
/// Ping doubles as the keep-alive and as the ack carrier: `cumulative_ack`
///  is the sender's highest in-order received reliable sequence number, and
///  acknowledges everything up to it in one step. Pong echoes the ping's
///  timestamp so the pinger can measure the round trip; its trailing four
///  bytes exist only to mirror Ping's layout and are ignored on receipt.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlMessage {
    Ping {
        timestamp: f64,
        cumulative_ack: SequenceNumber,
    },
    Pong {
        timestamp: f64,
    },
}

impl ControlMessage {
    /// kind byte + f64 timestamp + u32 ack (or padding)
    pub const SERIALIZED_LEN: usize = 1 + size_of::<f64>() + size_of::<u32>();

    pub fn ser(&self, buf: &mut impl BufMut) {
        match self {
            ControlMessage::Ping { timestamp, cumulative_ack } => {
                buf.put_u8(KIND_PING);
                buf.put_f64_le(*timestamp);
                buf.put_u32_le(cumulative_ack.to_raw());
            }
            ControlMessage::Pong { timestamp } => {
                buf.put_u8(KIND_PONG);
                buf.put_f64_le(*timestamp);
                buf.put_u32_le(0);
            }
        }
    }

    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<ControlMessage> {
        match buf.try_get_u8()? {
            KIND_PING => {
                let timestamp = buf.try_get_f64_le()?;
                let cumulative_ack = SequenceNumber::from_raw(buf.try_get_u32_le()?);
                Ok(ControlMessage::Ping { timestamp, cumulative_ack })
            }
            KIND_PONG => {
                let timestamp = buf.try_get_f64_le()?;
                Ok(ControlMessage::Pong { timestamp })
            }
            kind => bail!("unknown control message kind {}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0.0, 0, vec![0, 0,0,0,0,0,0,0,0, 0,0,0,0])]
    #[case::two_seconds(2.0, 0, vec![0, 0,0,0,0,0,0,0,0x40, 0,0,0,0])]
    #[case::with_ack(2.0, 5, vec![0, 0,0,0,0,0,0,0,0x40, 5,0,0,0])]
    fn test_ser_ping(#[case] timestamp: f64, #[case] ack: u32, #[case] expected: Vec<u8>) {
        let original = ControlMessage::Ping {
            timestamp,
            cumulative_ack: SequenceNumber::from_raw(ack),
        };

        let mut buf = BytesMut::new();
        original.ser(&mut buf);
        assert_eq!(buf.len(), ControlMessage::SERIALIZED_LEN);
        assert_eq!(buf.as_ref(), expected.as_slice());

        let mut b: &[u8] = &buf;
        let deser = ControlMessage::deser(&mut b).unwrap();
        assert!(b.is_empty());
        assert_eq!(deser, original);
    }

    #[test]
    fn test_ser_pong() {
        let original = ControlMessage::Pong { timestamp: 2.0 };

        let mut buf = BytesMut::new();
        original.ser(&mut buf);
        assert_eq!(buf.len(), ControlMessage::SERIALIZED_LEN);
        assert_eq!(buf.as_ref(), &[1, 0, 0, 0, 0, 0, 0, 0, 0x40, 0, 0, 0, 0]);

        let mut b: &[u8] = &buf;
        assert_eq!(ControlMessage::deser(&mut b).unwrap(), original);
    }

    /// whatever a peer puts into pong's trailing bytes must not matter
    #[rstest]
    #[case::garbage_trailer(vec![1, 0,0,0,0,0,0,0,0x40, 0xDE,0xAD,0xBE,0xEF])]
    #[case::no_trailer(vec![1, 0,0,0,0,0,0,0,0x40])]
    fn test_deser_pong_ignores_trailer(#[case] raw: Vec<u8>) {
        let mut b: &[u8] = &raw;
        let deser = ControlMessage::deser(&mut b).unwrap();
        assert_eq!(deser, ControlMessage::Pong { timestamp: 2.0 });
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::ping_no_timestamp(vec![0])]
    #[case::ping_partial_timestamp(vec![0, 1,2,3])]
    #[case::ping_no_ack(vec![0, 0,0,0,0,0,0,0,0x40])]
    #[case::pong_partial_timestamp(vec![1, 1,2,3])]
    fn test_deser_rejects_truncated(#[case] raw: Vec<u8>) {
        let mut b: &[u8] = &raw;
        assert!(ControlMessage::deser(&mut b).is_err());
    }

    #[rstest]
    #[case::two(vec![2, 0,0,0,0,0,0,0,0, 0,0,0,0])]
    #[case::high(vec![0xFF])]
    fn test_deser_rejects_unknown_kind(#[case] raw: Vec<u8>) {
        let mut b: &[u8] = &raw;
        assert!(ControlMessage::deser(&mut b).is_err());
    }
}
