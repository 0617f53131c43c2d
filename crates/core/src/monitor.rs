//! Per-node monitors.
//!
//! A `PacketMonitor` is the whole packet pipeline for one node:
//!
//! ```text
//! channel events -> EventClock + FrameReassembler -> Frame
//!                -> PacketDecoder (preamble, envelope, tree routing)
//!                -> packet line on the OutputSink, FrameObservers
//! ```
//!
//! Everything for one node happens on one logical timeline. Before a byte is
//! appended, every boundary timer due at or before the byte's timestamp is
//! fired, so a frame is always sealed, decoded and reported before any byte
//! of the next frame is seen.
//!
//! `WatchMonitor` and `StatsTable` cover the measurement side: named
//! accumulators reported as one fixed-width table.

use crate::channel::{ChannelEvent, ChannelTiming};
use crate::clock::{BoundaryTimer, EventClock};
use crate::error::{Error, Result};
use crate::frame::{Frame, PreambleFilter};
use crate::metrics::PacketCounters;
use crate::packet::{DecodedPacket, PacketDecoder};
use crate::protocol::ProtocolTable;
use crate::reassembly::FrameReassembler;
use crate::report::{
    node_time_prefix, render_packet_line, render_quantities, render_stats_table, OutputSink,
    STATS_HEADER,
};
use crate::stats::OnlineStats;
use crate::watch::IntegerWatch;
use tracing::warn;

/// Options of a packet monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Print a line for every packet as it is sealed
    pub show_packets: bool,

    /// Keep preamble marker bytes in the decoded frame
    pub show_preamble: bool,

    /// Drop the first byte of every frame
    pub discard_first_byte: bool,

    /// Render tree routing messages instead of raw envelopes
    pub show_tree_packets: bool,

    pub timing: ChannelTiming,
    pub protocol: ProtocolTable,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            show_packets: true,
            show_preamble: false,
            discard_first_byte: true,
            show_tree_packets: true,
            timing: ChannelTiming::default(),
            protocol: ProtocolTable::default(),
        }
    }
}

impl MonitorOptions {
    pub fn preamble_filter(&self) -> PreambleFilter {
        PreambleFilter {
            discard_first_byte: self.discard_first_byte,
            show_preamble: self.show_preamble,
        }
    }
}

/// Receives every decoded packet, in the order frames were sealed.
pub trait FrameObserver: Send {
    /// `time` is the simulated time at which the frame was sealed.
    fn on_packet(&mut self, node: u32, time: u64, packet: &DecodedPacket);
}

/// Packet pipeline for a single node.
pub struct PacketMonitor {
    node: u32,
    options: MonitorOptions,
    clock: EventClock,
    reassembler: FrameReassembler,
    decoder: PacketDecoder,
    sink: OutputSink,
    observers: Vec<Box<dyn FrameObserver>>,

    // Stats
    counters: PacketCounters,
    frame_lengths: OnlineStats,
    payload_lengths: OnlineStats,
}

impl PacketMonitor {
    pub fn new(node: u32, options: MonitorOptions, sink: OutputSink) -> Self {
        Self {
            node,
            options,
            clock: EventClock::new(),
            reassembler: FrameReassembler::new(options.timing),
            decoder: PacketDecoder::new(
                options.preamble_filter(),
                options.protocol,
                options.show_tree_packets,
            ),
            sink,
            observers: Vec::new(),
            counters: PacketCounters::new(),
            frame_lengths: OnlineStats::new(),
            payload_lengths: OnlineStats::new(),
        }
    }

    /// Register an observer for decoded packets.
    pub fn add_observer(&mut self, observer: Box<dyn FrameObserver>) {
        self.observers.push(observer);
    }

    pub fn node(&self) -> u32 {
        self.node
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    /// Feed one byte event.
    ///
    /// Boundaries due at or before the event's timestamp fire first.
    ///
    /// # Errors
    /// Only if writing a packet line to the sink fails.
    pub fn on_event(&mut self, event: ChannelEvent) -> Result<()> {
        if event.timestamp < self.clock.now() {
            warn!(
                node = self.node,
                timestamp = event.timestamp,
                now = self.clock.now(),
                "channel event out of order, treating as current time"
            );
        }

        self.advance_to(event.timestamp)?;
        self.counters.record_byte(event.direction);
        self.reassembler.on_byte(&event, &mut self.clock);
        Ok(())
    }

    /// Let simulated time pass without channel activity.
    pub fn advance_to(&mut self, time: u64) -> Result<()> {
        while let Some(expiry) = self.clock.pop_due(time) {
            if let Some(frame) = self.reassembler.on_boundary_timeout(expiry.token) {
                self.end_packet(frame, expiry.deadline)?;
            }
        }
        self.clock.advance_to(time);
        Ok(())
    }

    /// End of stream: let pending boundaries fire and seal anything left.
    pub fn finish(&mut self) -> Result<()> {
        for expiry in self.clock.drain() {
            if let Some(frame) = self.reassembler.on_boundary_timeout(expiry.token) {
                self.end_packet(frame, expiry.deadline)?;
            }
        }
        if let Some(frame) = self.reassembler.finish(&mut self.clock) {
            let now = self.clock.now();
            self.end_packet(frame, now)?;
        }
        Ok(())
    }

    fn end_packet(&mut self, frame: Frame, time: u64) -> Result<()> {
        self.counters.record_packet(frame.direction());
        self.frame_lengths.record(frame.raw_len() as i64);

        let packet = self.decoder.decode(frame);
        self.classify(&packet);

        if self.options.show_packets {
            let prefix = node_time_prefix(self.node, time);
            self.sink.emit_line(&render_packet_line(&prefix, &packet))?;
        }
        for observer in &mut self.observers {
            observer.on_packet(self.node, time, &packet);
        }
        Ok(())
    }

    fn classify(&mut self, packet: &DecodedPacket) {
        if packet.truncated > 0 {
            self.counters.truncated += 1;
        }
        if packet.is_ack() {
            self.counters.acks += 1;
        } else if !packet.envelope.valid {
            self.counters.corrupted += 1;
        } else {
            self.payload_lengths.record(i64::from(packet.envelope.length));
            if packet.record.is_applicable() {
                self.counters.tree_routing += 1;
            }
        }
    }

    pub fn counters(&self) -> &PacketCounters {
        &self.counters
    }

    /// Raw length of every sealed frame.
    pub fn frame_lengths(&self) -> &OnlineStats {
        &self.frame_lengths
    }

    /// Declared payload length of every valid envelope.
    pub fn payload_lengths(&self) -> &OnlineStats {
        &self.payload_lengths
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Aggregate report lines: bytes and packets, sent and received.
    pub fn report_lines(&self) -> Vec<String> {
        render_quantities(&self.counters.aggregate())
    }

    /// Emit the aggregate report as one block.
    pub fn report(&self) -> Result<()> {
        self.sink.emit(self.report_lines())
    }

    /// Frame and payload length statistics of this node.
    pub fn stats_table(&self) -> StatsTable {
        let mut table = StatsTable::new(STATS_HEADER)
            .with_title(format!("Packet lengths for node {}:", self.node));
        table.insert("frame_len", self.frame_lengths.clone());
        table.insert("payload_len", self.payload_lengths.clone());
        table
    }
}

impl std::fmt::Debug for PacketMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketMonitor")
            .field("node", &self.node)
            .field("options", &self.options)
            .field("counters", &self.counters)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Ordered set of named accumulators reported as one table.
#[derive(Debug, Clone)]
pub struct StatsTable {
    title: Option<String>,
    header: &'static str,
    rows: Vec<(String, OnlineStats)>,
}

impl StatsTable {
    /// Table with the given column header, e.g. `STATS_HEADER`.
    pub fn new(header: &'static str) -> Self {
        Self {
            title: None,
            header,
            rows: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Accumulator for `name`, created at the end of the table if new.
    pub fn row(&mut self, name: &str) -> &mut OnlineStats {
        let index = match self.rows.iter().position(|(row, _)| row == name) {
            Some(index) => index,
            None => {
                self.rows.push((name.to_string(), OnlineStats::new()));
                self.rows.len() - 1
            }
        };
        &mut self.rows[index].1
    }

    /// Add a pre-filled accumulator, replacing any row of the same name.
    pub fn insert(&mut self, name: &str, stats: OnlineStats) {
        *self.row(name) = stats;
    }

    pub fn record(&mut self, name: &str, value: i64) {
        self.row(name).record(value);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> Vec<String> {
        render_stats_table(
            self.title.as_deref(),
            self.header,
            self.rows.iter().map(|(name, stats)| (name.as_str(), stats.report())),
        )
    }

    /// Emit the whole table under one sink lock.
    pub fn emit(&self, sink: &OutputSink) -> Result<()> {
        sink.emit(self.render())
    }
}

/// Memory watches of one node, reported as a table.
#[derive(Debug)]
pub struct WatchMonitor {
    node: u32,
    title: String,
    watches: Vec<IntegerWatch>,
    sink: OutputSink,
}

impl WatchMonitor {
    pub fn new(node: u32, title: impl Into<String>, sink: OutputSink) -> Self {
        Self {
            node,
            title: title.into(),
            watches: Vec::new(),
            sink,
        }
    }

    /// Add a watch; returns its index for `on_write`.
    pub fn add_watch(&mut self, watch: IntegerWatch) -> usize {
        self.watches.push(watch);
        self.watches.len() - 1
    }

    pub fn watches(&self) -> &[IntegerWatch] {
        &self.watches
    }

    /// Handle a write to watch `index` at simulated `time`.
    ///
    /// # Errors
    /// `Error::Config` for an unknown index; sink errors when echoing.
    pub fn on_write(&mut self, index: usize, time: u64, memory: &[u8]) -> Result<Option<u32>> {
        let watch = self
            .watches
            .get_mut(index)
            .ok_or_else(|| Error::Config(format!("no memory watch with index {index}")))?;

        let value = watch.on_write(memory);
        if let (Some(value), true) = (value, watch.echo()) {
            let line = watch.echo_line(&node_time_prefix(self.node, time), value);
            self.sink.emit_line(&line)?;
        }
        Ok(value)
    }

    pub fn table(&self) -> StatsTable {
        let mut table = StatsTable::new(STATS_HEADER).with_title(self.title.clone());
        for watch in &self.watches {
            table.insert(watch.name(), watch.stats().clone());
        }
        table
    }

    pub fn report(&self) -> Result<()> {
        self.table().emit(&self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Direction;
    use crate::report::CapturedOutput;
    use std::sync::{Arc, Mutex};

    const BYTE_TIME: u64 = 10;

    fn monitor(options: MonitorOptions) -> (PacketMonitor, CapturedOutput) {
        let (sink, output) = OutputSink::capture();
        (PacketMonitor::new(3, options, sink), output)
    }

    fn options() -> MonitorOptions {
        MonitorOptions {
            timing: ChannelTiming::new(BYTE_TIME).unwrap(),
            ..MonitorOptions::default()
        }
    }

    fn send(monitor: &mut PacketMonitor, start: u64, bytes: &[u8], direction: Direction) -> u64 {
        let mut time = start;
        for &byte in bytes {
            monitor.on_event(ChannelEvent::new(byte, time, direction)).unwrap();
            time += BYTE_TIME;
        }
        time
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<(u32, u64, DecodedPacket)>>>);

    impl FrameObserver for Collect {
        fn on_packet(&mut self, node: u32, time: u64, packet: &DecodedPacket) {
            self.0.lock().unwrap().push((node, time, packet.clone()));
        }
    }

    #[test]
    fn test_ack_then_generic_packet() {
        let (mut monitor, output) = monitor(options());

        let end = send(&mut monitor, 0, &[0xAA, 0x01, 0x02], Direction::Receive);
        let frame = [0x00, 0xAA, 0x7E, 10, 11, 1, 0, 2, 0, 32, 2, 0xDE, 0xAD];
        send(&mut monitor, end + 100, &frame, Direction::Transmit);
        monitor.finish().unwrap();

        let lines = output.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Packet Rx: == ACK =="));
        assert!(lines[1].ends_with(
            "Packet Tx: DID: 10 SID: 11 DST ADDR: 1 SRC ADDR: 2 TYPE: 32 LEN: 2 DATA: de ad"
        ));

        let counters = monitor.counters();
        assert_eq!(counters.bytes_received, 3);
        assert_eq!(counters.bytes_transmitted, frame.len() as u64);
        assert_eq!(counters.packets_received, 1);
        assert_eq!(counters.packets_transmitted, 1);
        assert_eq!(counters.acks, 1);
    }

    #[test]
    fn test_packet_line_stamped_with_boundary_time() {
        let (mut monitor, output) = monitor(options());

        send(&mut monitor, 100, &[1, 2, 3], Direction::Receive);
        monitor.advance_to(10_000).unwrap();

        // Last byte at 120, boundary two byte times later
        let expected = format!("{} Packet Rx: == ACK ==", node_time_prefix(3, 140));
        assert_eq!(output.lines(), vec![expected]);
    }

    #[test]
    fn test_hide_packets_still_counts() {
        let (mut monitor, output) = monitor(MonitorOptions {
            show_packets: false,
            ..options()
        });

        send(&mut monitor, 0, &[1, 2, 3, 4], Direction::Receive);
        monitor.finish().unwrap();

        assert!(output.contents().is_empty());
        assert_eq!(monitor.counters().packets_received, 1);
        assert_eq!(monitor.counters().corrupted, 1);
    }

    #[test]
    fn test_observer_sees_every_packet() {
        let (mut monitor, _output) = monitor(options());
        let collected = Collect::default();
        monitor.add_observer(Box::new(collected.clone()));

        let end = send(&mut monitor, 0, &[1, 2, 3], Direction::Receive);
        send(&mut monitor, end + 50, &[4, 5, 6, 7], Direction::Receive);
        monitor.finish().unwrap();

        let seen = collected.0.lock().unwrap();
        let seqs: Vec<u64> = seen.iter().map(|(_, _, p)| p.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert!(seen.iter().all(|(node, _, _)| *node == 3));
    }

    #[test]
    fn test_report_lines() {
        let (mut monitor, output) = monitor(MonitorOptions {
            show_packets: false,
            ..options()
        });

        send(&mut monitor, 0, &[1, 2, 3], Direction::Transmit);
        monitor.finish().unwrap();
        monitor.report().unwrap();

        assert_eq!(
            output.lines(),
            vec![
                "Bytes sent: 3",
                "Bytes received: 0",
                "Packets sent: 1",
                "Packets received: 0"
            ]
        );
    }

    #[test]
    fn test_frame_length_stats() {
        let (mut monitor, _output) = monitor(options());

        let end = send(&mut monitor, 0, &[1, 2, 3], Direction::Receive);
        send(&mut monitor, end + 100, &[1, 2, 3, 4, 5], Direction::Receive);
        monitor.finish().unwrap();

        let report = monitor.frame_lengths().report();
        assert_eq!(report.count, 2);
        assert_eq!(report.mean, 4.0);
        assert_eq!(report.max, 5);
        assert_eq!(report.min, 3);

        let lines = monitor.stats_table().render();
        assert_eq!(lines[0], "Packet lengths for node 3:");
        assert!(lines[3].starts_with(" frame_len "));
        // Neither frame carried a valid envelope
        assert!(lines[4].starts_with(" payload_len ") && lines[4].contains("NaN"));
    }

    #[test]
    fn test_stats_table_keeps_row_order() {
        let mut table = StatsTable::new(STATS_HEADER).with_title("Heap Profile: ");
        table.record("malloc_efrag", 4);
        table.record("alloc", 10);
        table.record("malloc_efrag", 6);

        let lines = table.render();
        assert_eq!(table.len(), 2);
        assert_eq!(lines[0], "Heap Profile: ");
        assert!(lines[3].starts_with(" malloc_efrag "));
        assert!(lines[4].starts_with(" alloc "));
    }

    #[test]
    fn test_watch_monitor_echo_and_report() {
        let (sink, output) = OutputSink::capture();
        let mut watches = WatchMonitor::new(0, "Heap Profile: ", sink);
        let quiet = watches.add_watch(IntegerWatch::new("malloc_efrag", 418, 2, false));
        let loud = watches.add_watch(IntegerWatch::new("num_blocks", 422, 2, true));

        assert_eq!(watches.on_write(quiet, 5, &[1, 0]).unwrap(), Some(1));
        assert_eq!(watches.on_write(loud, 7, &[2, 1]).unwrap(), Some(258));
        assert!(watches.on_write(9, 7, &[0]).is_err());

        assert_eq!(output.lines(), vec![format!("{} num_blocks 258", node_time_prefix(0, 7))]);

        watches.report().unwrap();
        let lines = output.lines();
        assert_eq!(lines.len(), 1 + 3 + 2);
        assert_eq!(lines[1], "Heap Profile: ");
    }
}
