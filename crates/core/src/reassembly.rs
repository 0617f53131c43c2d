//! Frame reassembly from a byte-serial channel.
//!
//! The channel delivers one event per byte and nothing marks where a packet
//! ends. The reassembler therefore uses timing: every byte (re)arms a
//! boundary timer `INTER_PACKET_TIME` ticks ahead, cancelling the previous
//! one. When a timer is allowed to fire, the channel has been idle for two
//! byte times and the bytes collected so far form one frame.
//!
//! # Design
//!
//! - **Single open frame**: bytes append to the in-progress frame, which is
//!   created lazily by the first byte after a boundary
//! - **Exact cancellation**: only the most recently armed token can seal a
//!   frame; a stale token that surfaces anyway is ignored
//! - **Bounded storage**: at most `RAW_FRAME_LIMIT` bytes are kept per
//!   frame; later bytes of an unbroken run are only counted
//! - **Sealed means immutable**: a sealed `Frame` is moved out and never
//!   touched again
//!
//! # Thread Safety
//!
//! This structure is NOT thread-safe. Each node owns one reassembler and
//! drives it from a single timeline.

use crate::channel::{ChannelEvent, ChannelTiming, Direction};
use crate::clock::{BoundaryTimer, TimerToken};
use crate::frame::{Frame, RAW_FRAME_LIMIT};
use tracing::{debug, trace};

/// Groups channel bytes into frames using an idle-gap timeout.
#[derive(Debug)]
pub struct FrameReassembler {
    /// Idle gap that closes a frame
    inter_packet_time: u64,

    /// Bytes of the in-progress frame (empty when no frame is open)
    current: Vec<u8>,

    /// Bytes of the in-progress frame past `RAW_FRAME_LIMIT`
    dropped: usize,

    /// Direction of the most recent byte
    direction: Direction,

    /// The only timer allowed to seal the current frame
    armed: Option<TimerToken>,

    /// Sequence index given to the next sealed frame
    next_seq: u64,

    // Statistics
    bytes_seen: u64,
    stale_timeouts: u64,
}

impl FrameReassembler {
    /// Create a reassembler for a channel with the given timing.
    pub fn new(timing: ChannelTiming) -> Self {
        Self {
            inter_packet_time: timing.inter_packet_time(),
            current: Vec::new(),
            dropped: 0,
            direction: Direction::Receive,
            armed: None,
            next_seq: 0,
            bytes_seen: 0,
            stale_timeouts: 0,
        }
    }

    /// Append a byte to the open frame and push the boundary out.
    ///
    /// The frame adopts the direction of this byte; if the channel flips
    /// mid-frame, the last direction wins.
    pub fn on_byte<T: BoundaryTimer>(&mut self, event: &ChannelEvent, timer: &mut T) {
        if let Some(previous) = self.armed.take() {
            timer.cancel(previous);
        }

        if self.current.len() < RAW_FRAME_LIMIT {
            self.current.push(event.byte_value);
        } else {
            self.dropped += 1;
        }
        self.direction = event.direction;
        self.bytes_seen += 1;

        self.armed = Some(timer.insert(self.inter_packet_time));
    }

    /// Handle a boundary timer that came due.
    ///
    /// # Returns
    /// - `Some(frame)` if `token` is the armed timer and a frame was open
    /// - `None` for a stale or foreign token
    pub fn on_boundary_timeout(&mut self, token: TimerToken) -> Option<Frame> {
        if self.armed != Some(token) {
            trace!(?token, "ignoring stale boundary timer");
            self.stale_timeouts += 1;
            return None;
        }
        self.armed = None;
        self.seal()
    }

    /// Seal whatever is open at end of stream.
    ///
    /// Cancels the pending boundary timer so it cannot fire later.
    pub fn finish<T: BoundaryTimer>(&mut self, timer: &mut T) -> Option<Frame> {
        if let Some(token) = self.armed.take() {
            timer.cancel(token);
        }
        self.seal()
    }

    fn seal(&mut self) -> Option<Frame> {
        if self.current.is_empty() {
            return None;
        }

        let bytes = std::mem::take(&mut self.current);
        let dropped = std::mem::take(&mut self.dropped);
        let seq = self.next_seq;
        self.next_seq += 1;

        debug!(
            seq,
            direction = %self.direction,
            raw_len = bytes.len() + dropped,
            "frame sealed"
        );
        Some(Frame::new(seq, self.direction, bytes).with_dropped(dropped))
    }

    /// Idle gap, in ticks, that closes a frame.
    pub fn inter_packet_time(&self) -> u64 {
        self.inter_packet_time
    }

    /// Check if a frame is currently being collected.
    pub fn has_open_frame(&self) -> bool {
        !self.current.is_empty()
    }

    /// Get statistics about reassembly so far.
    pub fn stats(&self) -> ReassemblerStats {
        ReassemblerStats {
            bytes_seen: self.bytes_seen,
            frames_sealed: self.next_seq,
            open_frame_len: self.current.len() + self.dropped,
            stale_timeouts: self.stale_timeouts,
        }
    }
}

/// Statistics about reassembler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReassemblerStats {
    /// Bytes appended since creation
    pub bytes_seen: u64,

    /// Frames handed downstream
    pub frames_sealed: u64,

    /// Bytes in the frame currently being collected
    pub open_frame_len: usize,

    /// Timer firings that did not belong to the open frame
    pub stale_timeouts: u64,
}
