//! Text rendering and the shared output sink.
//!
//! The line layouts here are an output contract: tools downstream of the
//! monitor parse them, so field labels, spacing and column widths must not
//! drift.
//!
//! # Packet Lines
//!
//! ```text
//! <node> <time> Packet Rx: == ACK ==
//! <node> <time> Packet Rx: == Corrupted Packet! ==
//! <node> <time> Packet Tx: <TR BEACON>  Seq No: 5 Parent: 16 HopCount: 2 estEntries: 3
//! <node> <time> Packet Tx: DID: 10 SID: 11 DST ADDR: 1 SRC ADDR: 2 TYPE: 32 LEN: 2 DATA: de ad
//! ```
//!
//! This layout intentionally differs from the legacy monitor output, which
//! put two spaces after `<TR DATA>` and a trailing space after each DATA byte.
//!
//! # Statistics Rows
//!
//! Name left-justified in 22 columns, then count (8), mean (10), std-dev
//! (10), max (9) and min (9) right-justified, columns separated by two
//! spaces. Every number but the count is printed as a single-precision
//! float.
//!
//! # Output Sink
//!
//! Several node timelines may report at once. `OutputSink` holds the lock
//! for the whole of one multi-line report, so lines from different nodes
//! never interleave inside a report.

use crate::error::Result;
use crate::packet::DecodedPacket;
use crate::stats::StatsReport;
use crate::tree_routing::SubProtocolRecord;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Payload text for a 3-byte acknowledgement frame.
pub const ACK_MARKER: &str = "== ACK ==";

/// Payload text for a frame whose envelope failed validation.
pub const CORRUPTED_MARKER: &str = "== Corrupted Packet! ==";

/// Column header for value statistics tables.
pub const STATS_HEADER: &str =
    " name                       count         avg       std          max        min";

/// Width of the thin separator under a table header.
pub const LINE_WIDTH: usize = 78;

/// Identify the node and simulated time a line belongs to.
pub fn node_time_prefix(node: u32, time: u64) -> String {
    format!("{:>4}  {:>10}", node, time)
}

/// Render everything after `Packet <Tx|Rx>: `.
pub fn render_payload(packet: &DecodedPacket) -> String {
    if packet.is_ack() {
        return ACK_MARKER.to_string();
    }

    let envelope = &packet.envelope;
    if !envelope.valid {
        return CORRUPTED_MARKER.to_string();
    }

    match packet.record {
        SubProtocolRecord::DataMsg {
            origin_addr,
            seqno,
            hopcount,
            origin_hopcount,
            dest_module,
            parent,
        } => format!(
            "<TR DATA> Origin: {origin_addr} Seq. No: {seqno} HopCount: {hopcount} \
             Origin HopCount: {origin_hopcount} Dest PID: {dest_module} Parent Addr: {parent}"
        ),
        SubProtocolRecord::Beacon {
            seqno,
            parent,
            hopcount,
            est_entries,
        } => format!(
            "<TR BEACON>  Seq No: {seqno} Parent: {parent} HopCount: {hopcount} \
             estEntries: {est_entries}"
        ),
        SubProtocolRecord::NotApplicable => {
            let data: Vec<String> = envelope.payload.iter().map(|b| format!("{b:x}")).collect();
            format!(
                "DID: {} SID: {} DST ADDR: {} SRC ADDR: {} TYPE: {} LEN: {} DATA: {}",
                envelope.dst_module,
                envelope.src_module,
                envelope.dst_addr,
                envelope.src_addr,
                envelope.msg_type,
                envelope.length,
                data.join(" ")
            )
        }
    }
}

/// Render a complete packet line.
pub fn render_packet_line(prefix: &str, packet: &DecodedPacket) -> String {
    format!(
        "{} Packet {}: {}",
        prefix,
        packet.direction.label(),
        render_payload(packet)
    )
}

/// Render one fixed-width statistics row.
pub fn render_stats_row(name: &str, report: &StatsReport) -> String {
    format!(
        " {:<22}  {:>8}  {:>10}  {:>10}  {:>9}  {:>9}",
        name,
        report.count,
        float_text(report.mean),
        float_text(report.std_dev),
        float_text(report.max as f64),
        float_text(report.min as f64),
    )
}

/// Render a titled statistics table: title, header, separator, one row
/// per accumulator in the given order.
pub fn render_stats_table<'a, I>(title: Option<&str>, header: &str, rows: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, StatsReport)>,
{
    let mut lines = Vec::new();
    if let Some(title) = title {
        lines.push(title.to_string());
    }
    lines.push(header.to_string());
    lines.push(separator());
    lines.extend(rows.into_iter().map(|(name, report)| render_stats_row(name, &report)));
    lines
}

/// Render the four aggregate quantities of a packet monitor.
pub fn render_quantities(quantities: &[(&str, u64)]) -> Vec<String> {
    quantities
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect()
}

/// Thin separator line.
pub fn separator() -> String {
    "-".repeat(LINE_WIDTH)
}

/// Single-precision text form of a statistics column.
///
/// Plain decimal with at least one fractional digit for magnitudes in
/// `[1e-3, 1e7)`, otherwise `d.dddE<exp>` (`5.0`, `0.25`, `2.0E7`,
/// `9.223372E18`, `1.5E-4`, `NaN`). Digits are the shortest that round-trip
/// the `f32`.
fn float_text(value: f64) -> String {
    let value = value as f32;
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}Infinity");
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return format!("{value:?}");
    }

    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}.0E{exponent}")
    }
}

/// Shared, serialised destination for report text.
///
/// Cloning gives another handle to the same destination.
#[derive(Clone)]
pub struct OutputSink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Sink writing into memory, with a handle to read what was written.
    pub fn capture() -> (Self, CapturedOutput) {
        let buffer = CapturedOutput::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Write a group of lines as one uninterrupted report.
    ///
    /// The lock is held until every line is written and flushed; it is
    /// released when the guard drops, on success or error alike.
    pub fn emit<I, S>(&self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut writer = self.lock();
        for line in lines {
            writeln!(writer, "{}", line.as_ref())?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn emit_line(&self, line: &str) -> Result<()> {
        self.emit(std::iter::once(line))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A panic in another reporter leaves the text intact; keep writing
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// In-memory writer shared between an `OutputSink` and its reader.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    /// Everything written so far, as text.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Direction;
    use crate::envelope::Envelope;
    use crate::stats::OnlineStats;

    fn packet(raw_len: usize, envelope: Envelope, record: SubProtocolRecord) -> DecodedPacket {
        DecodedPacket {
            seq: 0,
            direction: Direction::Receive,
            raw_len,
            truncated: 0,
            envelope,
            record,
        }
    }

    #[test]
    fn test_ack_wins_over_everything() {
        let envelope = Envelope::decode(&[1, 2, 3]);
        let line = render_payload(&packet(3, envelope, SubProtocolRecord::NotApplicable));
        assert_eq!(line, "== ACK ==");
    }

    #[test]
    fn test_corrupted_marker() {
        let envelope = Envelope::decode(&[1, 2, 3, 4]);
        let line = render_payload(&packet(10, envelope, SubProtocolRecord::NotApplicable));
        assert_eq!(line, "== Corrupted Packet! ==");
    }

    #[test]
    fn test_generic_envelope_line() {
        let envelope = Envelope::decode(&Envelope::encode(10, 11, 1, 2, 32, &[0xDE, 0x0A, 0x00]));
        let line = render_payload(&packet(17, envelope, SubProtocolRecord::NotApplicable));
        assert_eq!(
            line,
            "DID: 10 SID: 11 DST ADDR: 1 SRC ADDR: 2 TYPE: 32 LEN: 3 DATA: de a 0"
        );
    }

    #[test]
    fn test_beacon_line() {
        let envelope = Envelope::decode(&Envelope::encode(141, 141, 0, 0, 33, &[0; 6]));
        let record = SubProtocolRecord::Beacon {
            seqno: 5,
            parent: 16,
            hopcount: 2,
            est_entries: 3,
        };
        assert_eq!(
            render_payload(&packet(20, envelope, record)),
            "<TR BEACON>  Seq No: 5 Parent: 16 HopCount: 2 estEntries: 3"
        );
    }

    #[test]
    fn test_data_line() {
        let envelope = Envelope::decode(&Envelope::encode(141, 141, 0, 0, 34, &[0; 10]));
        let record = SubProtocolRecord::DataMsg {
            origin_addr: 4,
            seqno: 9,
            hopcount: 1,
            origin_hopcount: 3,
            dest_module: 128,
            parent: 2,
        };
        assert_eq!(
            render_payload(&packet(24, envelope, record)),
            "<TR DATA> Origin: 4 Seq. No: 9 HopCount: 1 Origin HopCount: 3 \
             Dest PID: 128 Parent Addr: 2"
        );
    }

    #[test]
    fn test_packet_line_prefix_and_direction() {
        let mut decoded = packet(3, Envelope::decode(&[]), SubProtocolRecord::NotApplicable);
        decoded.direction = Direction::Transmit;

        let line = render_packet_line(&node_time_prefix(2, 1500), &decoded);
        assert_eq!(line, "   2        1500 Packet Tx: == ACK ==");
    }

    #[test]
    fn test_stats_row_layout() {
        let mut stats = OnlineStats::new();
        for v in [2, 4, 4, 4, 5, 5, 7, 9] {
            stats.record(v);
        }

        let row = render_stats_row("alloc", &stats.report());
        assert_eq!(
            row,
            " alloc                          8         5.0         2.0        9.0        2.0"
        );
        assert_eq!(STATS_HEADER.len(), row.len());
    }

    #[test]
    fn test_empty_stats_row_renders_nan() {
        let row = render_stats_row("idle", &OnlineStats::new().report());
        assert!(row.contains("NaN"));
        // min never moved off i64::MAX
        assert!(row.ends_with("  9.223372E18"), "{row:?}");
    }

    #[test]
    fn test_large_values_use_exponent_form() {
        let mut stats = OnlineStats::new();
        stats.record(20_000_000);

        let row = render_stats_row("ticks", &stats.report());
        assert_eq!(
            row,
            " ticks                          1       2.0E7         0.0      2.0E7      2.0E7"
        );
        assert_eq!(row.len(), STATS_HEADER.len());
    }

    #[test]
    fn test_float_text_forms() {
        assert_eq!(float_text(5.0), "5.0");
        assert_eq!(float_text(0.0), "0.0");
        assert_eq!(float_text(0.25), "0.25");
        assert_eq!(float_text(0.001), "0.001");
        assert_eq!(float_text(9_999_999.0), "9999999.0");
        assert_eq!(float_text(10_000_000.0), "1.0E7");
        assert_eq!(float_text(123_456_789.0), "1.2345679E8");
        assert_eq!(float_text(0.00015), "1.5E-4");
        assert_eq!(float_text(-2.5e9), "-2.5E9");
        assert_eq!(float_text(f64::NAN), "NaN");
    }

    #[test]
    fn test_stats_table() {
        let mut stats = OnlineStats::new();
        stats.record(1);

        let rows = [("alloc", stats.report())];
        let lines = render_stats_table(Some("Heap Profile: "), STATS_HEADER, rows);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Heap Profile: ");
        assert_eq!(lines[1], STATS_HEADER);
        assert_eq!(lines[2].len(), LINE_WIDTH);
        assert!(lines[3].starts_with(" alloc "));
    }

    #[test]
    fn test_quantities() {
        let lines = render_quantities(&[("Bytes sent", 3), ("Packets sent", 1)]);
        assert_eq!(lines, vec!["Bytes sent: 3", "Packets sent: 1"]);
    }

    #[test]
    fn test_emit_keeps_report_together() {
        let (sink, output) = OutputSink::capture();
        let workers: Vec<_> = (0..4)
            .map(|node| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        let lines: Vec<String> =
                            (0..5).map(|i| format!("node {node} line {i}")).collect();
                        sink.emit(&lines).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let lines = output.lines();
        assert_eq!(lines.len(), 4 * 20 * 5);
        for report in lines.chunks(5) {
            let node = report[0].split_whitespace().nth(1).unwrap();
            for (i, line) in report.iter().enumerate() {
                assert_eq!(line, &format!("node {node} line {i}"));
            }
        }
    }
}
