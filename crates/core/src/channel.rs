//! Channel events and timing.
//!
//! The radio channel hands the monitor one event per byte, stamped with the
//! simulated time (in clock ticks) at which the byte went over the air.

use crate::error::{Error, Result};
use std::fmt;

/// Ticks needed to move one byte over the air at the default radio rate.
pub const DEFAULT_TRANSFER_TIME_PER_BYTE: u64 = 3072;

/// Which way a byte travelled relative to the monitored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Transmit,
    Receive,
}

impl Direction {
    /// Short label used in packet lines.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Transmit => "Tx",
            Direction::Receive => "Rx",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One byte seen on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelEvent {
    pub byte_value: u8,
    pub timestamp: u64,
    pub direction: Direction,
}

impl ChannelEvent {
    pub fn new(byte_value: u8, timestamp: u64, direction: Direction) -> Self {
        Self {
            byte_value,
            timestamp,
            direction,
        }
    }

    pub fn transmit(byte_value: u8, timestamp: u64) -> Self {
        Self::new(byte_value, timestamp, Direction::Transmit)
    }

    pub fn receive(byte_value: u8, timestamp: u64) -> Self {
        Self::new(byte_value, timestamp, Direction::Receive)
    }
}

/// Channel rate, expressed as ticks per byte.
///
/// The frame boundary threshold is a flat idle gap of two byte times; it
/// does not depend on how long the frame is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTiming {
    transfer_time_per_byte: u64,
}

impl ChannelTiming {
    /// Create timing for the given per-byte transfer time.
    ///
    /// # Errors
    /// `Error::Config` if the transfer time is zero, since every byte would
    /// then close its own frame.
    pub fn new(transfer_time_per_byte: u64) -> Result<Self> {
        if transfer_time_per_byte == 0 {
            return Err(Error::Config(
                "transfer time per byte must be at least one tick".to_string(),
            ));
        }
        Ok(Self {
            transfer_time_per_byte,
        })
    }

    pub fn transfer_time_per_byte(&self) -> u64 {
        self.transfer_time_per_byte
    }

    /// Idle gap after which the current frame is considered finished.
    pub fn inter_packet_time(&self) -> u64 {
        self.transfer_time_per_byte.saturating_mul(2)
    }
}

impl Default for ChannelTiming {
    fn default() -> Self {
        Self {
            transfer_time_per_byte: DEFAULT_TRANSFER_TIME_PER_BYTE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inter_packet_time_is_two_byte_times() {
        let timing = ChannelTiming::new(100).unwrap();
        assert_eq!(timing.inter_packet_time(), 200);

        let default = ChannelTiming::default();
        assert_eq!(
            default.inter_packet_time(),
            2 * DEFAULT_TRANSFER_TIME_PER_BYTE
        );
    }

    #[test]
    fn test_zero_transfer_time_rejected() {
        assert!(matches!(ChannelTiming::new(0), Err(Error::Config(_))));
    }

    #[test]
    fn test_direction_labels() {
        assert_eq!(Direction::Transmit.to_string(), "Tx");
        assert_eq!(Direction::Receive.to_string(), "Rx");
    }
}
