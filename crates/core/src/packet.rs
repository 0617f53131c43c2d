//! From sealed frame to decoded packet.
//!
//! Decoding runs in three steps, all pure:
//! 1. Strip the preamble (`frame::PreambleFilter`)
//! 2. Parse the outer envelope (`envelope::Envelope::decode`)
//! 3. Optionally recognise a tree routing message
//!    (`tree_routing::SubProtocolDecoder`)
//!
//! The raw frame length travels with the result because the reporter needs
//! it to recognise acknowledgements, which the envelope alone cannot show.

use crate::channel::Direction;
use crate::envelope::Envelope;
use crate::frame::{Frame, PreambleFilter, ACK_FRAME_LEN};
use crate::protocol::ProtocolTable;
use crate::tree_routing::{SubProtocolDecoder, SubProtocolRecord};
use tracing::warn;

/// Everything known about one sealed frame after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    /// Sequence index of the source frame
    pub seq: u64,

    pub direction: Direction,

    /// Unfiltered byte count of the source frame
    pub raw_len: usize,

    /// Bytes dropped by the collection cap
    pub truncated: usize,

    pub envelope: Envelope,
    pub record: SubProtocolRecord,
}

impl DecodedPacket {
    /// True for a bare 3-byte acknowledgement.
    pub fn is_ack(&self) -> bool {
        self.raw_len == ACK_FRAME_LEN
    }
}

/// Decodes sealed frames into packets.
#[derive(Debug, Clone, Copy)]
pub struct PacketDecoder {
    filter: PreambleFilter,
    sub_protocol: SubProtocolDecoder,
    decode_tree_packets: bool,
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new(PreambleFilter::default(), ProtocolTable::default(), true)
    }
}

impl PacketDecoder {
    pub fn new(filter: PreambleFilter, table: ProtocolTable, decode_tree_packets: bool) -> Self {
        Self {
            filter,
            sub_protocol: SubProtocolDecoder::new(table),
            decode_tree_packets,
        }
    }

    /// Decode a frame, consuming it.
    pub fn decode(&self, frame: Frame) -> DecodedPacket {
        let filtered = self.filter.apply(frame.raw_bytes());
        let truncated = filtered.truncated + frame.dropped_bytes();
        if truncated > 0 {
            warn!(
                seq = frame.seq(),
                dropped = truncated,
                "frame exceeded collection cap, truncating"
            );
        }

        let envelope = Envelope::decode(&filtered.bytes);
        let record = if self.decode_tree_packets {
            self.sub_protocol.decode(&envelope)
        } else {
            SubProtocolRecord::NotApplicable
        };

        DecodedPacket {
            seq: frame.seq(),
            direction: frame.direction(),
            raw_len: frame.raw_len(),
            truncated,
            envelope,
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bytes: &[u8]) -> Frame {
        Frame::new(7, Direction::Transmit, bytes.to_vec())
    }

    fn on_air(envelope: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x00, 0xAA, 0xAA, 0x33, 0xCC, 0x7E];
        bytes.extend_from_slice(envelope);
        bytes
    }

    #[test]
    fn test_beacon_frame() {
        let raw = on_air(&[0x8D, 0x8D, 0x21, 0x00, 0x22, 0x00, 0x21, 0x06, 5, 0, 16, 0, 2, 3]);
        let packet = PacketDecoder::default().decode(frame(&raw));

        assert_eq!(packet.seq, 7);
        assert_eq!(packet.raw_len, raw.len());
        assert!(packet.envelope.valid);
        assert_eq!(
            packet.record,
            SubProtocolRecord::Beacon {
                seqno: 5,
                parent: 16,
                hopcount: 2,
                est_entries: 3
            }
        );
    }

    #[test]
    fn test_tree_decoding_disabled() {
        let raw = on_air(&[0x8D, 0x8D, 0, 0, 0, 0, 0x21, 0x06, 5, 0, 16, 0, 2, 3]);
        let decoder =
            PacketDecoder::new(PreambleFilter::default(), ProtocolTable::default(), false);
        let packet = decoder.decode(frame(&raw));

        assert!(packet.envelope.valid);
        assert_eq!(packet.record, SubProtocolRecord::NotApplicable);
    }

    #[test]
    fn test_ack_frame() {
        let packet = PacketDecoder::default().decode(frame(&[0x00, 0xAA, 0x01]));
        assert!(packet.is_ack());
        assert!(!packet.envelope.valid);
    }

    #[test]
    fn test_oversized_frame_truncated() {
        let mut envelope = vec![1, 2, 0, 0, 0, 0, 3, 0xFF];
        envelope.extend(std::iter::repeat(0x11).take(400));
        let packet = PacketDecoder::default().decode(frame(&on_air(&envelope)));

        assert!(packet.truncated > 0);
        // 8 + 255 does not fit in 256 collected bytes
        assert!(!packet.envelope.valid);
    }

    #[test]
    fn test_unstored_bytes_count_as_truncated() {
        let mut envelope = vec![1, 2, 0, 0, 0, 0, 3, 4];
        envelope.extend(std::iter::repeat(0x11).take(600));
        let raw = on_air(&envelope);
        let stored = raw.len();
        let packet = PacketDecoder::default().decode(frame(&raw).with_dropped(100));

        // 256 of the stored payload bytes fit, the rest plus 100 unstored are lost
        assert_eq!(packet.raw_len, stored + 100);
        assert_eq!(packet.truncated, (stored - 6) - 256 + 100);
        assert!(packet.envelope.valid);
    }
}
