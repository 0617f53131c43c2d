//! Error types for the monitor pipeline.
//!
//! Noisy radio input is never an error here: malformed frames, unknown
//! sub-protocols, empty accumulators and oversized frames are all absorbed
//! and show up only in the rendered output. What remains are failures of
//! the surroundings (writing to the output sink, reading a trace, bad
//! configuration) plus the low-level byte reader used by the decoders.

use thiserror::Error;

/// Top-level error type for all fallible operations.
///
/// Each variant corresponds to a specific failure domain:
/// - Byte I/O: reading little-endian fields past the end of a payload
/// - Trace: a channel trace line that could not be parsed
/// - Config: rejected configuration values
/// - I/O: the output sink or a trace file
#[derive(Debug, Error)]
pub enum Error {
    /// Byte-level read failed (e.g., reading past end of buffer)
    #[error("byte I/O error: {0}")]
    ByteIo(#[from] ByteIoError),

    /// Channel trace could not be parsed
    #[error("trace error: {0}")]
    Trace(#[from] TraceError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Output sink or file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-level read errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ByteIoError {
    /// Attempted to read more bytes than remain in the buffer
    #[error("unexpected end of buffer: requested {requested}, available {available}")]
    UnexpectedEof { requested: usize, available: usize },
}

/// Channel trace parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    /// Line does not have the `<node> <timestamp> <tx|rx> <byte>` shape
    #[error("line {line}: expected 4 fields, got {fields}")]
    FieldCount { line: usize, fields: usize },

    /// A numeric field did not parse
    #[error("line {line}: invalid {field} {value:?}")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// Direction field was neither `tx` nor `rx`
    #[error("line {line}: invalid direction {value:?} (expected tx or rx)")]
    InvalidDirection { line: usize, value: String },

    /// Timestamps went backwards within one node
    #[error("line {line}: timestamp {timestamp} precedes {previous} for node {node}")]
    TimeWentBackwards {
        line: usize,
        node: u32,
        timestamp: u64,
        previous: u64,
    },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
