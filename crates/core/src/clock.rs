//! Simulated clock with rearmable delayed callbacks.
//!
//! Stands in for the simulator's event queue: callers insert a timer at a
//! delay from "now", may cancel it, and later ask which timers have come
//! due as simulated time moves forward.
//!
//! # Implementation
//!
//! Uses a priority queue (min-heap) keyed by deadline. Cancellation does not
//! search the heap; the token is dropped from the live set and skipped when
//! it surfaces. A cancelled token is therefore never reported as due, no
//! matter how late the cancellation happened relative to its deadline.
//!
//! # Thread Safety
//! Not thread-safe; each node timeline owns its own clock.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Handle to one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// A timer that has come due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub token: TimerToken,
    pub deadline: u64,
}

/// The one-shot delayed-callback primitive a frame reassembler needs.
pub trait BoundaryTimer {
    /// Current simulated time.
    fn now(&self) -> u64;

    /// Arm a timer that fires `delay` ticks from now.
    fn insert(&mut self, delay: u64) -> TimerToken;

    /// Cancel a pending timer. Returns false if it already fired or was
    /// cancelled before.
    fn cancel(&mut self, token: TimerToken) -> bool;
}

/// A timer with its deadline, ordered for the heap.
#[derive(Debug, Clone, Copy)]
struct ScheduledTimer {
    deadline: u64,
    token: TimerToken,
}

impl PartialEq for ScheduledTimer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.token == other.token
    }
}

impl Eq for ScheduledTimer {}

impl PartialOrd for ScheduledTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; ties fire in insertion order
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.token.0.cmp(&self.token.0))
    }
}

/// Discrete-event clock over simulated ticks.
#[derive(Debug, Default)]
pub struct EventClock {
    now: u64,
    next_token: u64,
    queue: BinaryHeap<ScheduledTimer>,
    live: HashSet<TimerToken>,

    // Statistics
    timers_inserted: u64,
    timers_cancelled: u64,
    timers_fired: u64,
}

impl EventClock {
    /// Create a clock starting at tick zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at the given tick.
    pub fn starting_at(now: u64) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    /// Pop the earliest live timer whose deadline is at or before `until`.
    ///
    /// The clock moves to that timer's deadline, so a callback running for
    /// it observes the time it was scheduled for.
    pub fn pop_due(&mut self, until: u64) -> Option<Expiry> {
        while let Some(top) = self.queue.peek() {
            if top.deadline > until {
                return None;
            }
            let Some(scheduled) = self.queue.pop() else {
                return None;
            };
            if !self.live.remove(&scheduled.token) {
                // cancelled
                continue;
            }
            self.now = self.now.max(scheduled.deadline);
            self.timers_fired += 1;
            return Some(Expiry {
                token: scheduled.token,
                deadline: scheduled.deadline,
            });
        }
        None
    }

    /// Move the clock forward to `time` and return every timer that fired
    /// on the way, in deadline order.
    ///
    /// The clock never moves backwards; an earlier `time` only collects
    /// timers that are already overdue.
    pub fn advance_to(&mut self, time: u64) -> Vec<Expiry> {
        let mut fired = Vec::new();
        while let Some(expiry) = self.pop_due(time) {
            fired.push(expiry);
        }
        self.now = self.now.max(time);
        fired
    }

    /// Fire every remaining live timer, regardless of deadline.
    ///
    /// Used at end of stream.
    pub fn drain(&mut self) -> Vec<Expiry> {
        let mut fired = Vec::new();
        while let Some(expiry) = self.pop_due(u64::MAX) {
            fired.push(expiry);
        }
        fired
    }

    /// Check if any live timers are pending.
    pub fn has_pending(&self) -> bool {
        !self.live.is_empty()
    }

    /// Get count of live timers.
    pub fn pending_count(&self) -> usize {
        self.live.len()
    }

    /// Get statistics about clock activity.
    pub fn stats(&self) -> ClockStats {
        ClockStats {
            timers_inserted: self.timers_inserted,
            timers_cancelled: self.timers_cancelled,
            timers_fired: self.timers_fired,
            timers_pending: self.live.len(),
        }
    }
}

impl BoundaryTimer for EventClock {
    fn now(&self) -> u64 {
        self.now
    }

    fn insert(&mut self, delay: u64) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;

        self.queue.push(ScheduledTimer {
            deadline: self.now.saturating_add(delay),
            token,
        });
        self.live.insert(token);
        self.timers_inserted += 1;
        token
    }

    fn cancel(&mut self, token: TimerToken) -> bool {
        let removed = self.live.remove(&token);
        if removed {
            self.timers_cancelled += 1;
        }
        removed
    }
}

/// Statistics about clock activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockStats {
    pub timers_inserted: u64,
    pub timers_cancelled: u64,
    pub timers_fired: u64,
    pub timers_pending: usize,
}
