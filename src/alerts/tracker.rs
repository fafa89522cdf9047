//! Per-key hysteresis and cooldown
//!
//! A key notifies when it becomes triggered, again while triggered only once
//! the cooldown has elapsed since the last message, and exactly once when it
//! clears. Recovery ignores the cooldown.

use super::types::{AlertKey, KeyState, Transition};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Alert state of every key seen so far
#[derive(Debug, Default)]
pub struct AlertTracker {
    states: HashMap<AlertKey, KeyState>,
}

impl AlertTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one observation and commit the resulting state
    pub fn observe(
        &mut self,
        key: &AlertKey,
        triggered: bool,
        cooldown: Duration,
        now: Instant,
    ) -> Transition {
        let state = self.states.entry(key.clone()).or_default();

        let transition = match (state.active, triggered) {
            (false, true) => Transition::Raised,
            (true, true) => {
                let due = state
                    .last_notified_at
                    .is_none_or(|last| now.saturating_duration_since(last) >= cooldown);
                if due {
                    Transition::Repeated
                } else {
                    Transition::Suppressed
                }
            }
            (true, false) => Transition::Recovered,
            (false, false) => Transition::Quiet,
        };

        state.active = triggered;
        if transition.notifies() {
            state.last_notified_at = Some(now);
        }
        transition
    }

    /// Current state of a key, if it was ever evaluated
    pub fn state(&self, key: &AlertKey) -> Option<KeyState> {
        self.states.get(key).copied()
    }

    /// Keys currently triggered
    pub fn active_keys(&self) -> Vec<&AlertKey> {
        self.states
            .iter()
            .filter(|(_, state)| state.active)
            .map(|(key, _)| key)
            .collect()
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// No key evaluated yet
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
