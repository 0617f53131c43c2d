//! sosmon-core: Packet and statistics monitors for simulated sensor nodes
//!
//! This library turns the byte-serial radio traffic of a simulated node
//! into decoded, human-readable packets:
//! - Groups timestamped channel bytes into frames by idle-gap timeout
//! - Strips the radio preamble and decodes the outer SOS envelope
//! - Recognises tree routing beacons and data messages inside envelopes
//! - Accumulates running statistics for any sampled integer quantity
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `byteio`: Little-endian field reading
//! - `channel`: Channel events and byte timing
//! - `clock`: Simulated clock with cancellable boundary timers
//! - `reassembly`: Timeout-based frame reassembly
//! - `frame`: Sealed frames and preamble filtering
//! - `envelope`: Outer packet format
//! - `protocol`, `tree_routing`: Sub-protocol table and decoder
//! - `packet`: Frame to decoded packet
//! - `stats`, `watch`: Online statistics and memory watches
//! - `report`: Output text contract and the shared output sink
//! - `monitor`: Per-node packet monitor and statistics tables
//! - `metrics`: Traffic counters
//!
//! # Design Principles
//!
//! - **No panics**: Malformed traffic is reported, never raised
//! - **Bounded memory**: A frame stores at most 1024 raw and 256 decoded bytes,
//!   however long the channel stays busy
//! - **Deterministic**: One logical timeline per node, driven by simulated time
//! - **Serialised output**: Multi-line reports never interleave across nodes

pub mod byteio;
pub mod channel;
pub mod clock;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod monitor;
pub mod packet;
pub mod protocol;
pub mod reassembly;
pub mod report;
pub mod stats;
pub mod tree_routing;
pub mod watch;

// Re-export commonly used types
pub use channel::{ChannelEvent, ChannelTiming, Direction};
pub use error::{Error, Result};
pub use monitor::{FrameObserver, MonitorOptions, PacketMonitor, StatsTable};
pub use report::OutputSink;
