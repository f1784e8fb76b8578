//! Cooldown windows shared by the probe and wake throttles.

use std::time::Duration;

/// Milliseconds until `next_allowed_at_millis`, or `0` when unset or elapsed.
pub fn remaining_millis(next_allowed_at_millis: Option<i64>, now_millis: i64) -> i64 {
    match next_allowed_at_millis {
        Some(next) if next > now_millis => next - now_millis,
        _ => 0,
    }
}

/// Observable state of a cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    /// Never armed.
    Unset,
    /// Armed and still running.
    Active {
        /// Milliseconds left.
        remaining_millis: i64,
    },
    /// Armed once, now elapsed.
    Expired,
}

/// A single "earliest next run" timestamp for one throttled action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownWindow {
    next_allowed_at_millis: Option<i64>,
}

impl CooldownWindow {
    /// An unset window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp at which the action is allowed again, if ever armed.
    pub fn next_allowed_at_millis(&self) -> Option<i64> {
        self.next_allowed_at_millis
    }

    /// Milliseconds left at `now_millis` (never negative).
    pub fn remaining(&self, now_millis: i64) -> i64 {
        remaining_millis(self.next_allowed_at_millis, now_millis)
    }

    /// Whether the action may run at `now_millis`.
    pub fn is_open(&self, now_millis: i64) -> bool {
        self.remaining(now_millis) == 0
    }

    /// Classify the window at `now_millis`.
    pub fn state(&self, now_millis: i64) -> CooldownState {
        match self.next_allowed_at_millis {
            None => CooldownState::Unset,
            Some(_) => match self.remaining(now_millis) {
                0 => CooldownState::Expired,
                remaining_millis => CooldownState::Active { remaining_millis },
            },
        }
    }

    /// Block the action until `now_millis + cooldown`.
    pub fn arm(&mut self, now_millis: i64, cooldown: Duration) {
        let cooldown_millis = i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX);
        self.next_allowed_at_millis = Some(now_millis.saturating_add(cooldown_millis));
    }
}
