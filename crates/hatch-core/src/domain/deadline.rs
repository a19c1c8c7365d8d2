//! Caller-provided deadline threaded through every blocking step.
//!
//! Network requests, cache locks, and child processes all consult the same
//! [`Deadline`]; once it expires the pipeline stops at the next boundary
//! with `ApplicationError::DeadlineExceeded`.

use std::time::{Duration, Instant};

/// An optional point in time after which work must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// No deadline; every wait may block indefinitely.
    pub fn none() -> Self {
        Self { at: None }
    }

    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// Build from an optional timeout.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::none, Self::after)
    }

    /// Time left, `None` when unbounded. Saturates at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Clamp a per-request timeout to what is left of the deadline.
    pub fn clamp(&self, timeout: Duration) -> Duration {
        self.remaining().map_or(timeout, |left| left.min(timeout))
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}
