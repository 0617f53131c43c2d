//! Raw frames and preamble filtering.
//!
//! A frame is the run of bytes the reassembler grouped together between two
//! idle gaps. On the air such a run looks like:
//!
//! ```text
//! +----------------------+
//! | noise byte           |  often garbage while the receiver locks on
//! +----------------------+
//! | preamble markers     |  any number of 0xAA / 0x33 / 0xCC
//! +----------------------+
//! | group byte           |  exactly one, skipped
//! +----------------------+
//! | envelope             |  8-byte header + payload (see `envelope`)
//! | (variable)           |
//! +----------------------+
//! ```
//!
//! Filtering happens once, when the frame is sealed; the raw bytes are kept
//! so the reporter can still tell a bare 3-byte acknowledgement apart from a
//! corrupted packet.

use crate::channel::Direction;

/// Marker bytes sent ahead of the payload.
pub const PREAMBLE_MARKERS: [u8; 3] = [0xAA, 0x33, 0xCC];

/// Maximum number of bytes collected from one frame after filtering.
pub const FRAME_CAPACITY: usize = 256;

/// Maximum number of raw bytes stored per frame.
///
/// Leaves room for noise and a long preamble ahead of a full
/// `FRAME_CAPACITY` payload; bytes past it are only counted.
pub const RAW_FRAME_LIMIT: usize = 1024;

/// Raw frame length that denotes a link-layer acknowledgement.
pub const ACK_FRAME_LEN: usize = 3;

/// A sealed run of raw bytes.
///
/// Built by the reassembler and handed downstream by value; there is no way
/// to append to a `Frame` once it exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    seq: u64,
    direction: Direction,
    bytes: Vec<u8>,
    dropped: usize,
}

impl Frame {
    pub(crate) fn new(seq: u64, direction: Direction, bytes: Vec<u8>) -> Self {
        Self {
            seq,
            direction,
            bytes,
            dropped: 0,
        }
    }

    /// Record bytes that arrived after `RAW_FRAME_LIMIT` was reached.
    pub(crate) fn with_dropped(mut self, dropped: usize) -> Self {
        self.dropped = dropped;
        self
    }

    /// Position of this frame in the reassembler's output (0-based).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Direction of the last byte appended before sealing.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Unfiltered bytes as seen on the channel, at most `RAW_FRAME_LIMIT`.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes the channel delivered, stored or not.
    pub fn raw_len(&self) -> usize {
        self.bytes.len() + self.dropped
    }

    /// Bytes counted but not stored.
    pub fn dropped_bytes(&self) -> usize {
        self.dropped
    }

    /// True for a bare 3-byte acknowledgement.
    pub fn is_ack(&self) -> bool {
        self.raw_len() == ACK_FRAME_LEN
    }
}

/// Result of stripping the preamble from a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredFrame {
    /// Bytes from the first payload byte on, at most `FRAME_CAPACITY`
    pub bytes: Vec<u8>,

    /// Payload bytes dropped because the capacity was reached
    pub truncated: usize,
}

/// How leading bytes are stripped before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreambleFilter {
    /// Drop the very first raw byte unconditionally
    pub discard_first_byte: bool,

    /// Keep marker bytes instead of skipping them
    pub show_preamble: bool,
}

impl Default for PreambleFilter {
    fn default() -> Self {
        Self {
            discard_first_byte: true,
            show_preamble: false,
        }
    }
}

impl PreambleFilter {
    /// Strip the preamble from a frame's raw bytes.
    ///
    /// # Algorithm
    /// 1. Optionally drop the first raw byte
    /// 2. While still in the preamble, skip marker bytes (unless shown)
    /// 3. Skip exactly one further byte, the group byte
    /// 4. The first byte after that which is not a marker starts the
    ///    payload; everything from there on is collected up to
    ///    `FRAME_CAPACITY`
    pub fn apply(&self, raw: &[u8]) -> FilteredFrame {
        let mut bytes = Vec::with_capacity(raw.len().min(FRAME_CAPACITY));
        let mut truncated = 0;
        let mut in_preamble = true;
        let mut group_seen = false;

        for (index, &byte) in raw.iter().enumerate() {
            if index == 0 && self.discard_first_byte {
                continue;
            }
            if in_preamble && !self.show_preamble && PREAMBLE_MARKERS.contains(&byte) {
                continue;
            }
            if in_preamble && !group_seen {
                group_seen = true;
                continue;
            }
            in_preamble = false;

            if bytes.len() < FRAME_CAPACITY {
                bytes.push(byte);
            } else {
                truncated += 1;
            }
        }

        FilteredFrame { bytes, truncated }
    }
}
