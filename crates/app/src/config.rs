//! Configuration for the sosmon application.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including randomized defaults that are reproducible with a seed).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments: without a trace file it
//! generates traffic for a few nodes. The seed is always printed so a run
//! can be repeated exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sosmon_core::channel::{ChannelTiming, DEFAULT_TRANSFER_TIME_PER_BYTE};
use sosmon_core::monitor::MonitorOptions;
use std::path::PathBuf;

/// Complete configuration for a monitoring run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Input ===
    /// Channel trace to replay (None = generate traffic)
    pub trace_file: Option<PathBuf>,

    /// Seed for generated traffic
    pub seed: u64,

    /// Number of generated nodes
    pub nodes: u32,

    /// Frames generated per node
    pub frames_per_node: usize,

    // === Monitor ===
    pub monitor: MonitorOptions,

    // === Behavior ===
    /// Whether to print detailed config
    pub print_config: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// Without `--seed` a time-based seed is used. Node and frame counts
    /// not given explicitly are drawn from the seed.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut trace_file: Option<PathBuf> = None;
        let mut seed: Option<u64> = None;
        let mut nodes: Option<u32> = None;
        let mut frames_per_node: Option<usize> = None;
        let mut transfer_time: Option<u64> = None;
        let mut monitor = MonitorOptions::default();
        let mut print_config = false;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--trace" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--trace requires a path".to_string());
                    }
                    trace_file = Some(PathBuf::from(&args[i]));
                }
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--nodes" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--nodes requires a number".to_string());
                    }
                    nodes = Some(args[i].parse().map_err(|_| "invalid nodes")?);
                }
                "--frames" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--frames requires a number".to_string());
                    }
                    frames_per_node = Some(args[i].parse().map_err(|_| "invalid frames")?);
                }
                "--transfer-time" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--transfer-time requires a number".to_string());
                    }
                    transfer_time = Some(args[i].parse().map_err(|_| "invalid transfer-time")?);
                }
                "--hide-packets" => {
                    monitor.show_packets = false;
                }
                "--show-preamble" => {
                    monitor.show_preamble = true;
                }
                "--keep-first-byte" => {
                    monitor.discard_first_byte = false;
                }
                "--no-tree-packets" => {
                    monitor.show_tree_packets = false;
                }
                "--print-config" => {
                    print_config = true;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        monitor.timing = ChannelTiming::new(transfer_time.unwrap_or(DEFAULT_TRANSFER_TIME_PER_BYTE))
            .map_err(|e| e.to_string())?;

        // Determine seed (explicit or time-based)
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default()
        });

        // Generate defaults using seed
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let nodes = nodes.unwrap_or_else(|| rng.gen_range(2..=4));
        if nodes == 0 {
            return Err("--nodes must be at least 1".to_string());
        }

        Ok(Config {
            trace_file,
            seed,
            nodes,
            frames_per_node: frames_per_node.unwrap_or_else(|| rng.gen_range(10..=40)),
            monitor,
            print_config,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.trace_file {
            Some(path) => println!("Trace file: {}", path.display()),
            None => {
                println!("Trace file: (generate traffic)");
                println!("Seed: {}", self.seed);
                println!("Nodes: {}", self.nodes);
                println!("Frames per node: {}", self.frames_per_node);
            }
        }
        println!();
        println!("=== Channel ===");
        println!("Transfer time: {} ticks/byte", self.monitor.timing.transfer_time_per_byte());
        println!("Inter-packet time: {} ticks", self.monitor.timing.inter_packet_time());
        println!();
        println!("=== Packet Monitor ===");
        println!("Show packets: {}", self.monitor.show_packets);
        println!("Show preamble: {}", self.monitor.show_preamble);
        println!("Discard first byte: {}", self.monitor.discard_first_byte);
        println!("Show tree packets: {}", self.monitor.show_tree_packets);
        println!();
    }
}

fn print_help() {
    println!("sosmon: Packet monitor for simulated sensor node radios");
    println!();
    println!("USAGE:");
    println!("    sosmon [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --trace <PATH>          Replay a channel trace (default: generate traffic)");
    println!("    --seed <N>              Random seed for generated traffic");
    println!("    --nodes <N>             Generated nodes (default: random 2-4)");
    println!("    --frames <N>            Generated frames per node (default: random 10-40)");
    println!();
    println!("    --transfer-time <TICKS> Clock ticks per byte on air (default: 3072)");
    println!("    --hide-packets          Don't print a line per packet");
    println!("    --show-preamble         Keep preamble bytes in decoded packets");
    println!("    --keep-first-byte       Don't discard the first byte of each frame");
    println!("    --no-tree-packets       Print tree routing messages as raw envelopes");
    println!();
    println!("    --print-config          Print resolved configuration");
    println!("    --help, -h              Print this help");
    println!();
    println!("TRACE FORMAT:");
    println!("    <node> <timestamp> <tx|rx> <byte hex>   one byte per line, # comments");
    println!();
    println!("EXAMPLES:");
    println!("    sosmon                                 # Random traffic, random seed");
    println!("    sosmon --seed 42 --nodes 3             # Deterministic run");
    println!("    sosmon --trace radio.trace --hide-packets");
    println!();
}
