use std::time::{Duration, Instant};

use tracing::debug;

use tails_types::{CloseReason, Decision, GateState, SHUTDOWN_SENTINEL};

/// Decides which inbound payloads become log lines
///
/// Starts warming, opens once the warm-up deadline passes and closes for
/// good on the shutdown sentinel, a transport failure or shutdown. Time is
/// injected, so the runtime drives it from a timer and tests from plain
/// `Instant` arithmetic.
#[derive(Debug)]
pub struct AdmissionGate {
    state: GateState,

    /// When the warm-up window ends
    opens_at: Instant,

    /// Set once, when the gate closes
    close_reason: Option<CloseReason>,
}

impl AdmissionGate {
    /// Create a gate whose warm-up window starts at `now`
    pub fn new(warmup: Duration, now: Instant) -> Self {
        let state = if warmup.is_zero() {
            GateState::Open
        } else {
            GateState::Warming
        };

        Self {
            state,
            opens_at: now + warmup,
            close_reason: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn opens_at(&self) -> Instant {
        self.opens_at
    }

    /// Deadline the warm-up timer should fire at, while still warming
    pub fn warmup_deadline(&self) -> Option<Instant> {
        (self.state == GateState::Warming).then_some(self.opens_at)
    }

    pub fn is_closed(&self) -> bool {
        self.state == GateState::Closed
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.as_ref()
    }

    /// Warm-up timer fired
    pub fn on_tick(&mut self) {
        if self.state == GateState::Warming {
            debug!("admission gate open");
            self.state = GateState::Open;
        }
    }

    /// Fire the warm-up timer if `now` is past the deadline
    pub fn advance_to(&mut self, now: Instant) {
        if now >= self.opens_at {
            self.on_tick();
        }
    }

    /// Offer one inbound payload
    pub fn on_message(&mut self, raw: String) -> Decision {
        if self.state == GateState::Closed {
            return Decision::Terminate;
        }

        if raw == SHUTDOWN_SENTINEL {
            self.close(CloseReason::Sentinel);
            return Decision::Terminate;
        }

        if self.state == GateState::Warming || raw.is_empty() {
            return Decision::Drop;
        }

        Decision::Accept(raw)
    }

    /// The stream failed; nothing further is admitted
    pub fn on_transport_failure(&mut self, reason: impl Into<String>) {
        self.close(CloseReason::Transport(reason.into()));
    }

    /// Close because the viewer is going away
    pub fn shutdown(&mut self) {
        self.close(CloseReason::Shutdown);
    }

    fn close(&mut self, reason: CloseReason) {
        if self.state == GateState::Closed {
            return;
        }
        debug!(?reason, "admission gate closed");
        self.state = GateState::Closed;
        self.close_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_warmup_drops_then_accepts() {
        let start = Instant::now();
        let mut gate = AdmissionGate::new(ms(10), start);

        gate.advance_to(start + ms(2));
        assert_eq!(gate.on_message("hello".to_string()), Decision::Drop);

        gate.advance_to(start + ms(11));
        assert_eq!(
            gate.on_message("hello".to_string()),
            Decision::Accept("hello".to_string())
        );
    }

    #[test]
    fn test_tick_opens_only_when_warming() {
        let mut gate = AdmissionGate::new(ms(10), Instant::now());
        assert_eq!(gate.warmup_deadline(), Some(gate.opens_at()));

        gate.on_tick();
        assert_eq!(gate.state(), GateState::Open);
        assert_eq!(gate.warmup_deadline(), None);

        gate.on_transport_failure("gone");
        gate.on_tick();
        assert_eq!(gate.state(), GateState::Closed);
    }

    #[test]
    fn test_zero_warmup_starts_open() {
        let mut gate = AdmissionGate::new(Duration::ZERO, Instant::now());
        assert_eq!(gate.state(), GateState::Open);
        assert_eq!(gate.on_message("x".to_string()), Decision::Accept("x".to_string()));
    }

    #[test]
    fn test_empty_payload_dropped() {
        let mut gate = AdmissionGate::new(Duration::ZERO, Instant::now());
        assert_eq!(gate.on_message(String::new()), Decision::Drop);
        assert_eq!(gate.state(), GateState::Open);
    }

    #[test]
    fn test_sentinel_terminates_from_any_state() {
        for warmup in [ms(10), Duration::ZERO] {
            let mut gate = AdmissionGate::new(warmup, Instant::now());
            assert_eq!(
                gate.on_message(SHUTDOWN_SENTINEL.to_string()),
                Decision::Terminate
            );
            assert_eq!(gate.close_reason(), Some(&CloseReason::Sentinel));

            for payload in ["after", "", SHUTDOWN_SENTINEL] {
                assert_eq!(gate.on_message(payload.to_string()), Decision::Terminate);
            }

            // no resurrection
            gate.on_tick();
            gate.advance_to(Instant::now() + ms(1000));
            assert_eq!(gate.on_message("later".to_string()), Decision::Terminate);
        }
    }

    #[test]
    fn test_first_close_reason_wins() {
        let mut gate = AdmissionGate::new(Duration::ZERO, Instant::now());
        gate.on_message(SHUTDOWN_SENTINEL.to_string());
        gate.on_transport_failure("late error");
        gate.shutdown();
        assert_eq!(gate.close_reason(), Some(&CloseReason::Sentinel));
    }

    #[test]
    fn test_transport_failure_terminates() {
        let mut gate = AdmissionGate::new(Duration::ZERO, Instant::now());
        gate.on_transport_failure("connection reset");
        assert_eq!(gate.on_message("x".to_string()), Decision::Terminate);
        assert_eq!(
            gate.close_reason(),
            Some(&CloseReason::Transport("connection reset".to_string()))
        );
    }
}
