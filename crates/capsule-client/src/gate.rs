//! Password gate in front of the interface.
//!
//! This is a convenience screen, not access control: the secret ships with
//! the client and the store does not check it.  Anyone with the binary can
//! recover it or skip the gate.

use std::time::{Duration, Instant};

use capsule_shared::constants::GATE_FAILURE_CUE_MS;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Gate {
    secret: String,
    unlocked: bool,
    input: String,
    rejected_at: Option<Instant>,
}

impl Gate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            unlocked: false,
            input: String::new(),
            rejected_at: None,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Text currently typed into the gate.  Kept after a failed attempt.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Compare the typed input with the secret, ignoring case.
    pub fn submit(&mut self) -> bool {
        if self.input.to_lowercase() == self.secret.to_lowercase() {
            self.unlocked = true;
            self.rejected_at = None;
            info!("Gate unlocked");
        } else {
            self.rejected_at = Some(Instant::now());
            debug!("Gate attempt rejected");
        }
        self.unlocked
    }

    pub fn try_unlock(&mut self, attempt: &str) -> bool {
        self.set_input(attempt);
        self.submit()
    }

    pub fn lock(&mut self) {
        self.unlocked = false;
        self.input.clear();
    }

    /// Whether the failure cue of the last rejected attempt is still showing.
    pub fn failure_cue_active(&self, now: Instant) -> bool {
        self.rejected_at
            .map(|at| now.saturating_duration_since(at) < Duration::from_millis(GATE_FAILURE_CUE_MS))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        let mut gate = Gate::new("maurain");
        assert!(gate.try_unlock("MauRain"));
        assert!(gate.is_unlocked());
    }

    #[test]
    fn test_rejection_keeps_input_and_shows_cue() {
        let mut gate = Gate::new("maurain");
        assert!(!gate.try_unlock("maurian"));
        assert!(!gate.is_unlocked());
        assert_eq!(gate.input(), "maurian");

        let now = Instant::now();
        assert!(gate.failure_cue_active(now));
        assert!(!gate.failure_cue_active(now + Duration::from_millis(600)));
    }

    #[test]
    fn test_lock_again() {
        let mut gate = Gate::new("x");
        gate.try_unlock("X");
        gate.lock();
        assert!(!gate.is_unlocked());
        assert!(gate.input().is_empty());
    }
}
