//! Tree routing messages carried inside SOS envelopes.
//!
//! # Message Formats
//!
//! ```text
//! Beacon (type 33, >= 6 bytes)       Data message (type 34, >= 9 bytes)
//! +------------------+                +--------------------+
//! | seqno (2)        |                | origin_addr (2)    |
//! +------------------+                +--------------------+
//! | parent (2)       |                | seqno (2)          |
//! +------------------+                +--------------------+
//! | hopcount (1)     |                | hopcount (1)       |
//! +------------------+                +--------------------+
//! | est_entries (1)  |                | origin_hopcount (1)|
//! +------------------+                +--------------------+
//!                                     | dest_module (1)    |
//!                                     +--------------------+
//!                                     | reserved (1)       |
//!                                     +--------------------+
//!                                     | parent (2)         |
//!                                     +--------------------+
//! ```
//!
//! All words are unsigned little-endian. Bytes past the fields above are
//! application data and are not interpreted here. A data message may stop
//! after its low parent byte (9 bytes); fields cut off that way read as zero.

use crate::byteio::ByteReader;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::protocol::ProtocolTable;
use std::borrow::Cow;
use tracing::debug;

/// Bytes covered by the beacon fields.
const BEACON_FIELDS_LEN: usize = 6;

/// Bytes covered by the data message fields, reserved byte included.
const DATA_FIELDS_LEN: usize = 10;

/// A tree routing message recognised inside an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubProtocolRecord {
    Beacon {
        seqno: u16,
        parent: u16,
        hopcount: u8,
        est_entries: u8,
    },
    DataMsg {
        origin_addr: u16,
        seqno: u16,
        hopcount: u8,
        origin_hopcount: u8,
        dest_module: u8,
        parent: u16,
    },
    /// The envelope is not tree routing traffic, or is too short for it
    NotApplicable,
}

impl SubProtocolRecord {
    pub fn is_applicable(&self) -> bool {
        !matches!(self, SubProtocolRecord::NotApplicable)
    }
}

/// Re-interprets envelope payloads as tree routing messages.
///
/// Stateless apart from its protocol table: decoding the same envelope
/// twice gives the same record.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubProtocolDecoder {
    table: ProtocolTable,
}

impl SubProtocolDecoder {
    pub fn new(table: ProtocolTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ProtocolTable {
        &self.table
    }

    /// Decode the envelope's payload if it carries a known message.
    ///
    /// Returns `NotApplicable` when the envelope is invalid, either module
    /// field is not tree routing, the type is unknown, or the payload is
    /// shorter than the message needs.
    pub fn decode(&self, envelope: &Envelope) -> SubProtocolRecord {
        let tree_routing = self
            .table
            .is_tree_routing(envelope.dst_module, envelope.src_module);
        if !envelope.valid || !tree_routing {
            return SubProtocolRecord::NotApplicable;
        }

        let payload = envelope.payload.as_slice();
        let decoded = if envelope.msg_type == self.table.beacon_type {
            if payload.len() < self.table.beacon_min_len {
                debug!(len = payload.len(), "beacon payload too short");
                return SubProtocolRecord::NotApplicable;
            }
            decode_beacon(&zero_padded(payload, BEACON_FIELDS_LEN))
        } else if envelope.msg_type == self.table.data_type {
            if payload.len() < self.table.data_min_len {
                debug!(len = payload.len(), "tree routing data payload too short");
                return SubProtocolRecord::NotApplicable;
            }
            decode_data(&zero_padded(payload, DATA_FIELDS_LEN))
        } else {
            return SubProtocolRecord::NotApplicable;
        };

        decoded.unwrap_or_else(|err| {
            debug!(%err, "tree routing payload truncated");
            SubProtocolRecord::NotApplicable
        })
    }
}

/// Extend a payload with zeros up to `len` bytes.
fn zero_padded(payload: &[u8], len: usize) -> Cow<'_, [u8]> {
    if payload.len() >= len {
        return Cow::Borrowed(payload);
    }
    let mut padded = payload.to_vec();
    padded.resize(len, 0);
    Cow::Owned(padded)
}

fn decode_beacon(payload: &[u8]) -> Result<SubProtocolRecord> {
    let mut reader = ByteReader::new(payload);
    Ok(SubProtocolRecord::Beacon {
        seqno: reader.read_u16_le()?,
        parent: reader.read_u16_le()?,
        hopcount: reader.read_u8()?,
        est_entries: reader.read_u8()?,
    })
}

fn decode_data(payload: &[u8]) -> Result<SubProtocolRecord> {
    let mut reader = ByteReader::new(payload);
    let origin_addr = reader.read_u16_le()?;
    let seqno = reader.read_u16_le()?;
    let hopcount = reader.read_u8()?;
    let origin_hopcount = reader.read_u8()?;
    let dest_module = reader.read_u8()?;
    reader.skip(1)?;
    let parent = reader.read_u16_le()?;

    Ok(SubProtocolRecord::DataMsg {
        origin_addr,
        seqno,
        hopcount,
        origin_hopcount,
        dest_module,
        parent,
    })
}
