//! sosmon: replay radio channel traffic through per-node packet monitors.
//!
//! Each node runs on its own thread with its own monitor; every monitor
//! writes to the same stdout sink. Diagnostics go to stderr via `tracing`,
//! filtered by `RUST_LOG` (default `warn`).

mod config;
mod input_gen;
mod trace;

use config::Config;
use sosmon_core::channel::ChannelEvent;
use sosmon_core::monitor::{MonitorOptions, PacketMonitor, StatsTable};
use sosmon_core::report::{OutputSink, STATS_HEADER};
use std::thread;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Monitor(#[from] sosmon_core::Error),

    #[error("monitor for node {0} panicked")]
    NodePanicked(u32),
}

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        let code = match e {
            AppError::Usage(_) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &[String]) -> Result<(), AppError> {
    let config = Config::from_args(args).map_err(AppError::Usage)?;
    if config.print_config {
        config.print();
    }

    let sink = OutputSink::stdout();
    let traces = match &config.trace_file {
        Some(path) => {
            info!(path = %path.display(), "loading channel trace");
            trace::load_trace(path)?
        }
        None => {
            sink.emit_line(&format!("Seed: {}", config.seed))?;
            input_gen::generate_traces(
                config.seed,
                config.nodes,
                config.frames_per_node,
                config.monitor.timing,
            )
        }
    };

    let workers: Vec<_> = traces
        .into_iter()
        .map(|(node, events)| {
            let sink = sink.clone();
            let options = config.monitor;
            (node, thread::spawn(move || monitor_node(node, events, options, sink)))
        })
        .collect();

    let mut monitors = Vec::with_capacity(workers.len());
    for (node, worker) in workers {
        let monitor = worker.join().map_err(|_| AppError::NodePanicked(node))??;
        monitors.push(monitor);
    }

    let mut lengths = StatsTable::new(STATS_HEADER).with_title("Packet lengths:");
    for monitor in &monitors {
        let mut report = vec![format!("Node {}:", monitor.node())];
        report.extend(monitor.report_lines());
        sink.emit(report)?;

        let node = monitor.node();
        lengths.insert(&format!("node {node} frame"), monitor.frame_lengths().clone());
        lengths.insert(&format!("node {node} payload"), monitor.payload_lengths().clone());
    }
    if !lengths.is_empty() {
        lengths.emit(&sink)?;
    }

    Ok(())
}

/// Drive one node's monitor over its whole trace.
fn monitor_node(
    node: u32,
    events: Vec<ChannelEvent>,
    options: MonitorOptions,
    sink: OutputSink,
) -> sosmon_core::Result<PacketMonitor> {
    let mut monitor = PacketMonitor::new(node, options, sink);
    for event in events {
        monitor.on_event(event)?;
    }
    monitor.finish()?;

    let counters = monitor.counters();
    info!(
        node,
        packets = counters.total_packets(),
        acks = counters.acks,
        corrupted = counters.corrupted,
        corruption_rate = counters.corruption_rate(),
        tree_routing = counters.tree_routing,
        "node finished"
    );
    Ok(monitor)
}
