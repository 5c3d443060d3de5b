//! Tick-counted cooldown timers.
//!
//! Cooldowns are plain fields decremented by the simulation step's `dt`, so
//! they only ever change inside a tick. Nothing fires asynchronously, and
//! dropping the owner cancels every pending cooldown with it.

/// A countdown in integer microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cooldown {
    remaining_us: u64,
}

impl Cooldown {
    pub const fn ready() -> Self {
        Self { remaining_us: 0 }
    }

    /// Start (or restart) the countdown.
    pub fn start(&mut self, duration_us: u64) {
        self.remaining_us = duration_us;
    }

    /// Consume `dt_us` of elapsed time. Returns true on the tick the
    /// cooldown runs out.
    pub fn tick(&mut self, dt_us: u64) -> bool {
        if self.remaining_us == 0 {
            return false;
        }
        self.remaining_us = self.remaining_us.saturating_sub(dt_us);
        self.remaining_us == 0
    }

    pub fn is_active(&self) -> bool {
        self.remaining_us > 0
    }

    pub fn remaining_us(&self) -> u64 {
        self.remaining_us
    }

    pub fn clear(&mut self) {
        self.remaining_us = 0;
    }
}

/// Convert a millisecond duration from config or level data.
pub const fn ms_to_us(ms: u64) -> u64 {
    ms * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cooldown_is_ready() {
        let cooldown = Cooldown::ready();
        assert!(!cooldown.is_active());
        assert_eq!(cooldown.remaining_us(), 0);
    }

    #[test]
    fn tick_counts_down_and_reports_expiry_once() {
        let mut cooldown = Cooldown::ready();
        cooldown.start(ms_to_us(1000));
        assert!(cooldown.is_active());

        assert!(!cooldown.tick(ms_to_us(600)));
        assert!(cooldown.is_active());
        assert!(cooldown.tick(ms_to_us(600)));
        assert!(!cooldown.is_active());

        // Already expired: no second report.
        assert!(!cooldown.tick(ms_to_us(600)));
    }

    #[test]
    fn restart_overrides_remaining_time() {
        let mut cooldown = Cooldown::ready();
        cooldown.start(100);
        cooldown.tick(90);
        cooldown.start(500);
        assert_eq!(cooldown.remaining_us(), 500);
    }

    #[test]
    fn clear_makes_cooldown_ready() {
        let mut cooldown = Cooldown::ready();
        cooldown.start(500);
        cooldown.clear();
        assert!(!cooldown.is_active());
    }
}
