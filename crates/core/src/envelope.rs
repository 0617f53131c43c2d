//! SOS envelope decoding.
//!
//! Every message on the channel is wrapped in the same outer envelope:
//!
//! ```text
//! +-------------------+
//! | dst_module (1)    |  u8
//! +-------------------+
//! | src_module (1)    |  u8
//! +-------------------+
//! | dst_addr (2)      |  u16 little-endian
//! +-------------------+
//! | src_addr (2)      |  u16 little-endian
//! +-------------------+
//! | msg_type (1)      |  u8
//! +-------------------+
//! | length (1)        |  u8 payload bytes that follow
//! +-------------------+
//! | payload           |  `length` bytes
//! | (variable)        |
//! +-------------------+
//! ```
//!
//! Decoding never fails. A frame too short for its header, or for the
//! payload length the header declares, decodes to an envelope with
//! `valid == false` and no payload so the reporter can still print a marker
//! for it. Trailing bytes after the declared payload are ignored.

/// Size of the fixed envelope header in bytes
pub const HEADER_SIZE: usize = 8;

/// A decoded outer packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// True when the header and the whole declared payload were present
    pub valid: bool,

    pub dst_module: u8,
    pub src_module: u8,
    pub dst_addr: u16,
    pub src_addr: u16,
    pub msg_type: u8,

    /// Declared payload length
    pub length: u8,

    /// Exactly `length` bytes when valid, empty otherwise
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Decode an envelope from filtered frame bytes.
    ///
    /// Header fields that fit in a short frame are still filled in for
    /// diagnostics; missing header bytes read as zero.
    pub fn decode(bytes: &[u8]) -> Self {
        let byte = |index: usize| bytes.get(index).copied().unwrap_or(0);
        let word = |index: usize| u16::from_le_bytes([byte(index), byte(index + 1)]);

        let length = byte(7);
        let end = HEADER_SIZE + length as usize;
        let valid = bytes.len() >= HEADER_SIZE && bytes.len() >= end;

        let payload = if valid {
            bytes[HEADER_SIZE..end].to_vec()
        } else {
            Vec::new()
        };

        Self {
            valid,
            dst_module: byte(0),
            src_module: byte(1),
            dst_addr: word(2),
            src_addr: word(4),
            msg_type: byte(6),
            length,
            payload,
        }
    }

    /// Total bytes this envelope occupies on the wire.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.length as usize
    }

    /// Serialize a valid envelope back into wire bytes.
    ///
    /// The header's length field is taken from the payload.
    pub fn encode(
        dst_module: u8,
        src_module: u8,
        dst_addr: u16,
        src_addr: u16,
        msg_type: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        let length = payload.len().min(u8::MAX as usize);
        let mut bytes = Vec::with_capacity(HEADER_SIZE + length);

        bytes.push(dst_module);
        bytes.push(src_module);
        bytes.extend_from_slice(&dst_addr.to_le_bytes());
        bytes.extend_from_slice(&src_addr.to_le_bytes());
        bytes.push(msg_type);
        bytes.push(length as u8);
        bytes.extend_from_slice(&payload[..length]);

        bytes
    }
}
