//! Integer values watched in node memory.
//!
//! A watch covers 1, 2 or 4 bytes at a fixed address. After every write
//! into that range the simulator hands the watch the current bytes; the
//! watch rebuilds the unsigned little-endian value and records it as one
//! sample. Watches of any other width are inert.

use crate::byteio::unsigned_le;
use crate::stats::{OnlineStats, StatsReport};

/// Accumulates statistics over an integer stored in memory.
#[derive(Debug, Clone)]
pub struct IntegerWatch {
    name: String,
    base: u32,
    size: usize,
    echo: bool,
    stats: OnlineStats,
}

impl IntegerWatch {
    /// Watch `size` bytes at `base`.
    ///
    /// With `echo` set, every sample should also be printed as it happens.
    pub fn new(name: impl Into<String>, base: u32, size: usize, echo: bool) -> Self {
        Self {
            name: name.into(),
            base,
            size,
            echo,
            stats: OnlineStats::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Handle a write to the watched range.
    ///
    /// `memory` starts at the watched address; only the first `size`
    /// bytes are used.
    ///
    /// # Returns
    /// The reconstructed value, or `None` when the width is unsupported or
    /// too few bytes were supplied (nothing is recorded then).
    pub fn on_write(&mut self, memory: &[u8]) -> Option<u32> {
        let value = memory.get(..self.size).and_then(unsigned_le)?;
        self.stats.record(i64::from(value));
        Some(value)
    }

    /// Line printed for an echoed sample.
    pub fn echo_line(&self, prefix: &str, value: u32) -> String {
        format!("{} {} {}", prefix, self.name, value)
    }

    pub fn stats(&self) -> &OnlineStats {
        &self.stats
    }

    pub fn report(&self) -> StatsReport {
        self.stats.report()
    }
}
