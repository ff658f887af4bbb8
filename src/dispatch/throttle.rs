//! Submission throttle: a per-window ceiling plus a cap on total submissions.
//!
//! All counters live in [`ThrottleState`], which the dispatch loop owns and
//! threads through explicitly. Time comes from [`tokio::time::Instant`] so a
//! paused test clock drives it deterministically.

use std::time::Duration;

use tokio::time::Instant;

/// Default submissions allowed per window.
pub const DEFAULT_PER_WINDOW: u64 = 1000;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default cap on total submissions.
pub const DEFAULT_DAILY_CAP: u64 = 10_000;

/// Length of one cap accounting period.
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Throttle limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleLimits {
    /// Submissions allowed before the rest of the window is slept out.
    pub per_window: u64,
    /// Window length.
    pub window: Duration,
    /// Submissions after which the run stops dispatching.
    pub daily_cap: u64,
}

impl Default for ThrottleLimits {
    fn default() -> Self {
        Self {
            per_window: DEFAULT_PER_WINDOW,
            window: DEFAULT_WINDOW,
            daily_cap: DEFAULT_DAILY_CAP,
        }
    }
}

/// What the dispatch loop does after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleAction {
    /// Keep submitting.
    Continue,
    /// Sleep this long, then call [`ThrottleState::start_new_window`].
    Pause(Duration),
    /// The cap is reached; stop dispatching for this run.
    CapReached,
}

/// Counters and deadlines of one dispatch run.
#[derive(Debug, Clone)]
pub struct ThrottleState {
    limits: ThrottleLimits,
    total: u64,
    window_count: u64,
    window_start: Instant,
    day_deadline: Instant,
}

impl ThrottleState {
    /// Starts a fresh state at `now` with `initial_total` already counted
    /// toward the cap.
    #[must_use]
    pub fn new(initial_total: u64, now: Instant, limits: ThrottleLimits) -> Self {
        Self {
            limits: ThrottleLimits {
                per_window: limits.per_window.max(1),
                ..limits
            },
            total: initial_total,
            window_count: 0,
            window_start: now,
            day_deadline: now + DAY,
        }
    }

    /// Submissions counted toward the cap.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Submissions in the current window.
    #[must_use]
    pub fn window_count(&self) -> u64 {
        self.window_count
    }

    #[must_use]
    pub fn limits(&self) -> ThrottleLimits {
        self.limits
    }

    /// Whether the cap is already exhausted.
    #[must_use]
    pub fn cap_reached(&self) -> bool {
        self.total >= self.limits.daily_cap
    }

    /// Counts one submission and says what to do next.
    ///
    /// The cap takes precedence over the window pause.
    pub fn record_submission(&mut self, now: Instant) -> ThrottleAction {
        self.total += 1;
        self.window_count += 1;

        if self.cap_reached() {
            return ThrottleAction::CapReached;
        }
        if self.window_count >= self.limits.per_window {
            let elapsed = now.saturating_duration_since(self.window_start);
            return ThrottleAction::Pause(self.limits.window.saturating_sub(elapsed));
        }
        ThrottleAction::Continue
    }

    /// Resets the window counter after a pause.
    pub fn start_new_window(&mut self, now: Instant) {
        self.window_start = now;
        self.window_count = 0;
    }

    /// Resets the cap counter once the day deadline has passed.
    ///
    /// Returns `true` if a reset happened.
    pub fn roll_day(&mut self, now: Instant) -> bool {
        if now < self.day_deadline {
            return false;
        }
        self.total = 0;
        self.day_deadline = now + DAY;
        true
    }
}
