use std::time::{Duration, Instant};

use tracing::{info, warn};

use tails_types::{ArcLogLine, CloseReason, Decision, GateState};

use crate::buffer::LogBuffer;
use crate::gate::AdmissionGate;

/// Sizing and timing for a session
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Ring buffer capacity in lines
    pub capacity: usize,

    /// Warm-up window after (re)subscribing
    pub warmup: Duration,

    /// Accepted lines longer than this many characters are cut
    pub max_line_length: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            capacity: 40_000,
            warmup: Duration::from_millis(500),
            max_line_length: 4096,
        }
    }
}

/// Result of ingesting one payload
#[derive(Clone, Debug)]
pub enum Ingested {
    Accepted(ArcLogLine),
    Dropped,
    Terminated,
}

/// Ingestion counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub dropped: u64,
    pub truncated: u64,
}

/// One subscription's worth of ingestion state
///
/// Threads every inbound payload through the admission gate, the line length
/// cap and the ring buffer. The buffer outlives gates: a resubscribe after a
/// transport failure gets a fresh gate but keeps the history.
#[derive(Debug)]
pub struct LogSession {
    gate: AdmissionGate,
    buffer: LogBuffer,
    options: SessionOptions,
    stats: IngestStats,
}

impl LogSession {
    pub fn new(options: SessionOptions, now: Instant) -> Self {
        Self {
            gate: AdmissionGate::new(options.warmup, now),
            buffer: LogBuffer::new(options.capacity),
            options,
            stats: IngestStats::default(),
        }
    }

    /// Offer one inbound payload received at `now`
    ///
    /// The warm-up deadline is checked here as well as by the timer, so a
    /// payload that arrives after the deadline is admitted even when the
    /// timer has not fired yet.
    pub fn ingest(&mut self, raw: String, now: Instant) -> Ingested {
        self.gate.advance_to(now);
        match self.gate.on_message(raw) {
            Decision::Accept(mut text) => {
                if truncate_chars(&mut text, self.options.max_line_length) {
                    self.stats.truncated += 1;
                }
                self.stats.accepted += 1;
                Ingested::Accepted(self.buffer.push(text))
            }
            Decision::Drop => {
                self.stats.dropped += 1;
                Ingested::Dropped
            }
            Decision::Terminate => Ingested::Terminated,
        }
    }

    /// Deadline for the warm-up timer, while warming
    pub fn warmup_deadline(&self) -> Option<Instant> {
        self.gate.warmup_deadline()
    }

    /// Warm-up timer fired at `now`
    pub fn on_warmup_elapsed(&mut self, now: Instant) {
        self.gate.advance_to(now);
    }

    /// The subscription failed
    pub fn transport_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "log stream failed");
        self.gate.on_transport_failure(reason);
    }

    pub fn shutdown(&mut self) {
        self.gate.shutdown();
    }

    /// Start over with a fresh gate after a transport failure.
    ///
    /// Refused (returns false) unless the current gate closed because of a
    /// transport failure: a gate retired by the sentinel or by shutdown stays
    /// retired.
    pub fn resubscribe(&mut self, now: Instant) -> bool {
        if !matches!(self.gate.close_reason(), Some(CloseReason::Transport(_))) {
            return false;
        }
        info!("resubscribing to log stream");
        self.gate = AdmissionGate::new(self.options.warmup, now);
        true
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.gate.close_reason()
    }

    /// Whether the subscription should still be consumed
    pub fn is_live(&self) -> bool {
        !self.gate.is_closed()
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }
}

/// Cut `text` to at most `max` characters, on a char boundary
fn truncate_chars(text: &mut String, max: usize) -> bool {
    match text.char_indices().nth(max) {
        Some((byte_pos, _)) => {
            text.truncate(byte_pos);
            true
        }
        None => false,
    }
}
