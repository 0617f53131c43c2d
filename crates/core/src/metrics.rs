//! Traffic counters for one monitored node.
//!
//! Bytes are counted as they arrive, by the direction of each byte event.
//! Packets are counted when a frame is sealed, by the direction the frame
//! ended up with. The finer counters (acks, corrupted frames, tree routing
//! messages, truncated frames) classify sealed frames after decoding.
//!
//! # Thread Safety
//!
//! `PacketCounters` is NOT thread-safe. Each node's monitor owns one.

use crate::channel::Direction;

/// Counts of bytes and packets seen by a packet monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketCounters {
    // === Bytes ===
    pub bytes_transmitted: u64,
    pub bytes_received: u64,

    // === Packets ===
    pub packets_transmitted: u64,
    pub packets_received: u64,

    // === Classification ===
    /// Frames rendered as acknowledgements
    pub acks: u64,

    /// Frames whose envelope failed validation
    pub corrupted: u64,

    /// Frames recognised as tree routing beacons or data messages
    pub tree_routing: u64,

    /// Frames that hit the collection cap
    pub truncated: u64,
}

impl PacketCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one byte event.
    pub fn record_byte(&mut self, direction: Direction) {
        match direction {
            Direction::Transmit => self.bytes_transmitted += 1,
            Direction::Receive => self.bytes_received += 1,
        }
    }

    /// Count one sealed frame.
    pub fn record_packet(&mut self, direction: Direction) {
        match direction {
            Direction::Transmit => self.packets_transmitted += 1,
            Direction::Receive => self.packets_received += 1,
        }
    }

    pub fn total_packets(&self) -> u64 {
        self.packets_transmitted + self.packets_received
    }

    /// Fraction of packets that failed envelope validation.
    ///
    /// Returns 0.0 if no packets were seen.
    pub fn corruption_rate(&self) -> f64 {
        let total = self.total_packets();
        if total == 0 {
            0.0
        } else {
            self.corrupted as f64 / total as f64
        }
    }

    /// The four labelled quantities of the aggregate packet report.
    pub fn aggregate(&self) -> [(&'static str, u64); 4] {
        [
            ("Bytes sent", self.bytes_transmitted),
            ("Bytes received", self.bytes_received),
            ("Packets sent", self.packets_transmitted),
            ("Packets received", self.packets_received),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directions_counted_separately() {
        let mut counters = PacketCounters::new();
        counters.record_byte(Direction::Transmit);
        counters.record_byte(Direction::Transmit);
        counters.record_byte(Direction::Receive);
        counters.record_packet(Direction::Receive);

        assert_eq!(counters.bytes_transmitted, 2);
        assert_eq!(counters.bytes_received, 1);
        assert_eq!(counters.packets_transmitted, 0);
        assert_eq!(counters.packets_received, 1);
    }

    #[test]
    fn test_aggregate_labels() {
        let mut counters = PacketCounters::new();
        counters.record_packet(Direction::Transmit);

        let aggregate = counters.aggregate();
        assert_eq!(aggregate[0], ("Bytes sent", 0));
        assert_eq!(aggregate[2], ("Packets sent", 1));
        assert_eq!(aggregate[3].0, "Packets received");
    }

    #[test]
    fn test_corruption_rate() {
        let mut counters = PacketCounters::new();
        assert_eq!(counters.corruption_rate(), 0.0);

        counters.packets_received = 4;
        counters.corrupted = 1;
        assert_eq!(counters.corruption_rate(), 0.25);
    }
}
