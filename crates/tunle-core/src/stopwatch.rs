use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StopwatchState {
    Idle,
    Running { since: Instant },
    Paused,
    Stopped,
}

/// Session completion timer. Time spent hidden is not counted.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
    state: StopwatchState,
    accumulated: Duration,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            state: StopwatchState::Idle,
            accumulated: Duration::ZERO,
        }
    }

    /// Starts counting; a stopwatch started while hidden waits for `resume`.
    pub fn start(&mut self, now: Instant, visible: bool) {
        if self.state != StopwatchState::Idle {
            return;
        }
        self.state = if visible {
            StopwatchState::Running { since: now }
        } else {
            StopwatchState::Paused
        };
    }

    pub fn pause(&mut self, now: Instant) {
        if let StopwatchState::Running { since } = self.state {
            self.accumulated += now.saturating_duration_since(since);
            self.state = StopwatchState::Paused;
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if self.state == StopwatchState::Paused {
            self.state = StopwatchState::Running { since: now };
        }
    }

    pub fn stop(&mut self, now: Instant) -> Duration {
        self.pause(now);
        if self.state != StopwatchState::Idle {
            self.state = StopwatchState::Stopped;
        }
        self.accumulated
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.state {
            StopwatchState::Running { since } => {
                self.accumulated + now.saturating_duration_since(since)
            }
            _ => self.accumulated,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, StopwatchState::Running { .. })
    }

    pub fn is_started(&self) -> bool {
        self.state != StopwatchState::Idle
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
