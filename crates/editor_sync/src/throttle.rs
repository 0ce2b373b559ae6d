//! Leading + trailing coalescing throttle.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What the caller should do with a trigger.
pub enum ThrottleDecision {
    /// Run the action now.
    RunNow,
    /// A trailing run was scheduled at this instant.
    RunAt(Instant),
    /// The trigger was folded into an already scheduled trailing run.
    Coalesced,
}

/// Time-only throttle state; the owner runs the action and drives the trailing timer.
///
/// The first trigger runs immediately. Triggers inside `min` of the last run collapse into one
/// trailing run at `last + min`. A trigger arriving `max` or more after the last run always runs
/// immediately and cancels any pending trailing run.
#[derive(Debug, Clone)]
pub struct Throttle {
    min: Duration,
    max: Duration,
    last_run: Option<Instant>,
    deadline: Option<Instant>,
}

impl Throttle {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
            last_run: None,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now: Instant) -> ThrottleDecision {
        let Some(last) = self.last_run else {
            return self.run(now);
        };
        let since = now.saturating_duration_since(last);
        if since >= self.max {
            return self.run(now);
        }
        if self.deadline.is_some() {
            return ThrottleDecision::Coalesced;
        }
        if since >= self.min {
            return self.run(now);
        }
        let at = last + self.min;
        self.deadline = Some(at);
        ThrottleDecision::RunAt(at)
    }

    /// Pending trailing run, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consumes the trailing run once its deadline has passed. Returns `true` when the caller
    /// should run the action.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if now >= at => {
                self.run(now);
                true
            }
            _ => false,
        }
    }

    fn run(&mut self, now: Instant) -> ThrottleDecision {
        self.deadline = None;
        self.last_run = Some(now);
        ThrottleDecision::RunNow
    }
}
