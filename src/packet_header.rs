use anyhow::bail;
use bytes::{Buf, BufMut};

use crate::buf_ext::BufExt;
use crate::sequence::SequenceNumber;

/// 0x5044554B, i.e. the bytes "KUDP" once the tag is laid out little-endian
///  on the wire. The low four bits are masked out and replaced by the packet
///  flags.
pub const PROTOCOL_ID: u32 = 1346655563;

const PROTOCOL_ID_MASK: u32 = 0xFFFF_FFF0;

const FLAG_RELIABLE: u32 = 1;
const FLAG_CONTROL: u32 = 2;

/// What a packet is for, and whether it takes part in the reliable sequence
///  space. Carried in the low bits of the tagged protocol id.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PacketKind {
    DataReliable,
    DataUnreliable,
    ControlReliable,
    ControlUnreliable,
}

impl PacketKind {
    pub fn from_flags(reliable: bool, control: bool) -> PacketKind {
        match (reliable, control) {
            (true, false) => PacketKind::DataReliable,
            (false, false) => PacketKind::DataUnreliable,
            (true, true) => PacketKind::ControlReliable,
            (false, true) => PacketKind::ControlUnreliable,
        }
    }

    pub fn is_reliable(&self) -> bool {
        matches!(self, PacketKind::DataReliable | PacketKind::ControlReliable)
    }

    pub fn is_control(&self) -> bool {
        matches!(self, PacketKind::ControlReliable | PacketKind::ControlUnreliable)
    }

    fn flag_bits(&self) -> u32 {
        let mut bits = 0;
        if self.is_reliable() {
            bits |= FLAG_RELIABLE;
        }
        if self.is_control() {
            bits |= FLAG_CONTROL;
        }
        bits
    }
}

/// The fixed 8-byte header in front of every datagram: a tagged protocol id
///  for filtering out stray traffic, and the packet's sequence number. All
///  fields are little-endian on the wire.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PacketHeader {
    pub packet_kind: PacketKind,
    pub sequence_number: SequenceNumber,
}

impl PacketHeader {
    pub const SERIALIZED_LEN: usize = 2 * size_of::<u32>();

    pub fn new(packet_kind: PacketKind, sequence_number: SequenceNumber) -> PacketHeader {
        PacketHeader {
            packet_kind,
            sequence_number,
        }
    }

    pub fn ser(&self, buf: &mut impl BufMut) {
        buf.put_u32_le((PROTOCOL_ID & PROTOCOL_ID_MASK) | self.packet_kind.flag_bits());
        buf.put_u32_le(self.sequence_number.to_raw());
    }

    /// Parses a header, rejecting datagrams whose tag does not carry this
    ///  protocol's id in its high 28 bits. Flag bits 2 and 3 are reserved and
    ///  ignored.
    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<PacketHeader> {
        let tag = buf.try_get_u32_le()?;
        if tag & PROTOCOL_ID_MASK != PROTOCOL_ID & PROTOCOL_ID_MASK {
            bail!("not a protocol datagram: tag {:#010x}", tag);
        }

        let reliable = tag & FLAG_RELIABLE != 0;
        let control = tag & FLAG_CONTROL != 0;
        let sequence_number = SequenceNumber::from_raw(buf.try_get_u32_le()?);

        Ok(PacketHeader {
            packet_kind: PacketKind::from_flags(reliable, control),
            sequence_number,
        })
    }
}
