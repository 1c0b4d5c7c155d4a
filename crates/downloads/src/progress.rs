use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Latest progress of one download, readable from any task without tearing.
#[derive(Debug)]
pub struct ProgressCell(AtomicU64);

impl ProgressCell {
    pub fn new() -> Self {
        Self(AtomicU64::new(0f64.to_bits()))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, progress: f64) {
        self.0.store(progress.to_bits(), Ordering::Release);
    }
}

impl Default for ProgressCell {
    fn default() -> Self {
        Self::new()
    }
}

const IDLE: u8 = 0;
const IN_FLIGHT: u8 = 1;
const STOPPED: u8 = 2;

/// Admits one status call at a time and records a stop request.
///
/// A call may only begin from idle. Stopping while a call is in flight makes the matching
/// [`finish`](PollGate::finish) fail, so the caller knows to discard the result.
#[derive(Debug, Default)]
pub struct PollGate(AtomicU8);

impl PollGate {
    pub fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    /// False once stopped; no call may begin after that.
    pub fn begin(&self) -> bool {
        self.0
            .compare_exchange(IDLE, IN_FLIGHT, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// False when a stop arrived while the call was in flight.
    pub fn finish(&self) -> bool {
        self.0
            .compare_exchange(IN_FLIGHT, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns true if a call was in flight at the time.
    pub fn stop(&self) -> bool {
        self.0.swap(STOPPED, Ordering::AcqRel) == IN_FLIGHT
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire) == STOPPED
    }

    pub fn in_flight(&self) -> bool {
        self.0.load(Ordering::Acquire) == IN_FLIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_round_trips_exact_bits() {
        let cell = ProgressCell::new();
        assert_eq!(cell.get(), 0.0);
        cell.set(33.333333333333336);
        assert_eq!(cell.get(), 33.333333333333336);
    }

    #[test]
    fn stop_during_call_discards_result() {
        let gate = PollGate::new();
        assert!(gate.begin());
        assert!(gate.in_flight());
        assert!(gate.stop());
        assert!(!gate.finish());
        assert!(!gate.begin());
        assert!(gate.is_stopped());
    }

    #[test]
    fn stop_between_calls_blocks_next_call() {
        let gate = PollGate::new();
        assert!(gate.begin());
        assert!(gate.finish());
        assert!(!gate.stop());
        assert!(!gate.begin());
    }
}
