//! Synthetic channel traffic for testing.
//!
//! When no trace file is given, we generate radio traffic for each node with
//! a mix of everything the packet monitor has to tell apart.
//!
//! # Design
//!
//! Every generated frame goes on the air as:
//! - One noise byte
//! - One to four preamble marker bytes
//! - The group byte
//! - An envelope
//!
//! except acknowledgements, which are three bare bytes. Bytes are spaced one
//! transfer time apart and frames are separated by idle gaps longer than the
//! inter-packet time, so each generated frame seals as exactly one packet.

use crate::trace::NodeTraces;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sosmon_core::channel::{ChannelEvent, ChannelTiming, Direction};
use sosmon_core::envelope::Envelope;
use sosmon_core::frame::PREAMBLE_MARKERS;
use sosmon_core::protocol::{MSG_BEACON_PKT, MSG_TR_DATA_PKT, TREE_ROUTING_PID};
use tracing::debug;

/// Group id byte sent after the preamble.
pub const GROUP_ID: u8 = 0x7E;

/// Module ids used for generic traffic (none of them is a preamble marker).
const GENERIC_MODULES: [u8; 5] = [10, 17, 64, 128, 144];

/// Broadcast address used by beacons.
const BROADCAST_ADDR: u16 = 0xFFFF;

/// What a generated frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Beacon,
    TreeData,
    Generic,
    Ack,
    /// Header declares more payload than is sent
    Corrupted,
}

/// One generated frame and its byte events.
#[derive(Debug, Clone)]
pub struct GeneratedFrame {
    pub kind: FrameKind,
    pub events: Vec<ChannelEvent>,
}

/// Generate `frames` frames of traffic for one node.
///
/// # Arguments
/// - `seed`: random seed for determinism (mixed with the node id)
/// - `node`: node id, used as the source address
/// - `frames`: number of frames
/// - `timing`: channel rate that spaces the bytes
pub fn generate_node_frames(
    seed: u64,
    node: u32,
    frames: usize,
    timing: ChannelTiming,
) -> Vec<GeneratedFrame> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ (u64::from(node) << 32));
    let byte_time = timing.transfer_time_per_byte();
    let mut time = rng.gen_range(0..=timing.inter_packet_time());
    let mut seqno: u16 = rng.gen();

    let mut generated = Vec::with_capacity(frames);
    for _ in 0..frames {
        let kind = match rng.gen_range(0..10) {
            // 30% beacons
            0..=2 => FrameKind::Beacon,
            // 20% tree routing data
            3..=4 => FrameKind::TreeData,
            // 20% other modules
            5..=6 => FrameKind::Generic,
            // 20% acknowledgements
            7..=8 => FrameKind::Ack,
            // 10% corrupted
            _ => FrameKind::Corrupted,
        };
        seqno = seqno.wrapping_add(1);

        let bytes = match kind {
            FrameKind::Ack => rng.gen::<[u8; 3]>().to_vec(),
            _ => {
                let envelope = envelope(&mut rng, kind, node, seqno);
                on_air(&mut rng, &envelope)
            }
        };
        let direction = if rng.gen_bool(0.5) {
            Direction::Transmit
        } else {
            Direction::Receive
        };

        let events = bytes
            .iter()
            .enumerate()
            .map(|(i, &byte)| ChannelEvent::new(byte, time + i as u64 * byte_time, direction))
            .collect::<Vec<_>>();

        // Strictly longer than the inter-packet time after the last byte
        let last = time + (bytes.len() as u64 - 1) * byte_time;
        time = last + timing.inter_packet_time() + 1 + rng.gen_range(0..=10 * byte_time);

        generated.push(GeneratedFrame { kind, events });
    }

    generated
}

/// Generate traffic for nodes `0..nodes`.
pub fn generate_traces(seed: u64, nodes: u32, frames: usize, timing: ChannelTiming) -> NodeTraces {
    (0..nodes)
        .map(|node| {
            let generated = generate_node_frames(seed, node, frames, timing);
            let count = |kind: FrameKind| generated.iter().filter(|f| f.kind == kind).count();
            debug!(
                node,
                beacons = count(FrameKind::Beacon),
                tree_data = count(FrameKind::TreeData),
                generic = count(FrameKind::Generic),
                acks = count(FrameKind::Ack),
                corrupted = count(FrameKind::Corrupted),
                "generated traffic"
            );

            let events = generated.into_iter().flat_map(|f| f.events).collect();
            (node, events)
        })
        .collect()
}

/// Envelope bytes for a non-acknowledgement frame.
fn envelope(rng: &mut ChaCha8Rng, kind: FrameKind, node: u32, seqno: u16) -> Vec<u8> {
    let src_addr = node as u16;
    match kind {
        FrameKind::Beacon => {
            let mut payload = Vec::with_capacity(6);
            payload.extend_from_slice(&seqno.to_le_bytes());
            payload.extend_from_slice(&rng.gen_range(0u16..16).to_le_bytes());
            payload.push(rng.gen_range(0..8));
            payload.push(rng.gen_range(0..16));
            Envelope::encode(
                TREE_ROUTING_PID,
                TREE_ROUTING_PID,
                BROADCAST_ADDR,
                src_addr,
                MSG_BEACON_PKT,
                &payload,
            )
        }
        FrameKind::TreeData => {
            let mut payload = Vec::with_capacity(10);
            payload.extend_from_slice(&rng.gen_range(0u16..16).to_le_bytes());
            payload.extend_from_slice(&seqno.to_le_bytes());
            payload.push(rng.gen_range(0..8));
            payload.push(rng.gen_range(0..8));
            payload.push(GENERIC_MODULES[rng.gen_range(0..GENERIC_MODULES.len())]);
            payload.push(0);
            payload.extend_from_slice(&rng.gen_range(0u16..16).to_le_bytes());
            Envelope::encode(
                TREE_ROUTING_PID,
                TREE_ROUTING_PID,
                rng.gen_range(0..16),
                src_addr,
                MSG_TR_DATA_PKT,
                &payload,
            )
        }
        FrameKind::Generic | FrameKind::Corrupted => {
            let payload: Vec<u8> = (0..rng.gen_range(0..12)).map(|_| rng.gen()).collect();
            let mut bytes = Envelope::encode(
                GENERIC_MODULES[rng.gen_range(0..GENERIC_MODULES.len())],
                GENERIC_MODULES[rng.gen_range(0..GENERIC_MODULES.len())],
                rng.gen_range(0..16),
                src_addr,
                rng.gen_range(1..32),
                &payload,
            );
            if kind == FrameKind::Corrupted {
                // Declare more than is sent
                bytes[7] = bytes[7].saturating_add(rng.gen_range(1..8));
            }
            bytes
        }
        FrameKind::Ack => Vec::new(),
    }
}

/// Wrap envelope bytes in noise, preamble and group byte.
fn on_air(rng: &mut ChaCha8Rng, envelope: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(envelope.len() + 6);
    bytes.push(rng.gen());
    for _ in 0..rng.gen_range(1..=4) {
        bytes.push(PREAMBLE_MARKERS[rng.gen_range(0..PREAMBLE_MARKERS.len())]);
    }
    bytes.push(GROUP_ID);
    bytes.extend_from_slice(envelope);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use sosmon_core::monitor::{MonitorOptions, PacketMonitor};
    use sosmon_core::report::OutputSink;

    fn timing() -> ChannelTiming {
        ChannelTiming::new(50).unwrap()
    }

    #[test]
    fn test_determinism() {
        let a = generate_traces(12345, 3, 20, timing());
        let b = generate_traces(12345, 3, 20, timing());
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds() {
        let a = generate_traces(1, 1, 20, timing());
        let b = generate_traces(2, 1, 20, timing());
        assert_ne!(a, b);
    }

    #[test]
    fn test_nodes_get_distinct_traffic() {
        let traces = generate_traces(7, 2, 20, timing());
        assert_eq!(traces.len(), 2);
        assert_ne!(traces[&0], traces[&1]);
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        for events in generate_traces(99, 3, 50, timing()).values() {
            assert!(events.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        }
    }

    #[test]
    fn test_monitor_sees_every_generated_frame() {
        for seed in 0..10 {
            let frames = generate_node_frames(seed, 4, 40, timing());
            let expect = |kind: FrameKind| frames.iter().filter(|f| f.kind == kind).count() as u64;

            let (sink, _output) = OutputSink::capture();
            let options = MonitorOptions {
                timing: timing(),
                ..MonitorOptions::default()
            };
            let mut monitor = PacketMonitor::new(4, options, sink);
            for frame in &frames {
                for &event in &frame.events {
                    monitor.on_event(event).unwrap();
                }
            }
            monitor.finish().unwrap();

            let counters = monitor.counters();
            assert_eq!(counters.total_packets(), 40);
            assert_eq!(counters.acks, expect(FrameKind::Ack));
            assert_eq!(counters.corrupted, expect(FrameKind::Corrupted));
            assert_eq!(
                counters.tree_routing,
                expect(FrameKind::Beacon) + expect(FrameKind::TreeData)
            );
        }
    }
}
