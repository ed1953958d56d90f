/// Time-gated polling.
///
/// The weather API is called only at fixed hours of the day (by default
/// 00:00, 06:00, 12:00 and 18:00). The daemon checks the gate every tick;
/// a check outside a gated hour, or a second check inside the same gated
/// hour, does nothing and the previous scores stay in place.
///
/// # Clock injection
/// `should_run_at` takes the current local time as a parameter rather than
/// reading the clock, so the gate is deterministic in tests.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

#[derive(Debug, Clone)]
pub struct PollGate {
    hours: Vec<u32>,
    last_slot: Option<(NaiveDate, u32)>,
    force: bool,
}

impl PollGate {
    pub fn new(hours: impl IntoIterator<Item = u32>) -> Self {
        let mut hours: Vec<u32> = hours.into_iter().filter(|&h| h < 24).collect();
        hours.sort_unstable();
        hours.dedup();
        Self {
            hours,
            last_slot: None,
            force: false,
        }
    }

    pub fn hours(&self) -> &[u32] {
        &self.hours
    }

    /// Lets the next check run regardless of the hour, e.g. at startup.
    pub fn force_next(&mut self) {
        self.force = true;
    }

    /// Returns `true` when a cycle should run now, and records the slot so
    /// the same gated hour does not run twice.
    pub fn should_run_at(&mut self, now: NaiveDateTime) -> bool {
        let slot = (now.date(), now.hour());

        if self.force {
            self.force = false;
            self.last_slot = Some(slot);
            return true;
        }

        if !self.hours.contains(&now.hour()) || self.last_slot == Some(slot) {
            return false;
        }

        self.last_slot = Some(slot);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
