//! Frame-based sprite animation clock.
//!
//! Every animated entity carries one `AnimationClock` keyed by its current
//! action state. The clock does not own frame data: callers hand it the
//! `FrameTable` for the active state on every `advance()`, so tables can live
//! as constants next to the state enum that selects them.
//!
//! All timing uses integer microseconds (`u64`) to guarantee deterministic
//! advancement under the engine's fixed-timestep model -- no floating-point
//! drift across platforms. Tables are authored in milliseconds for
//! readability and converted by the `const` constructors.

/// Frame count and per-frame duration for one action state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTable {
    pub frame_count: usize,
    pub frame_duration_us: u64,
    /// One-shot tables hold their last frame and report `finished` once a
    /// full cycle has elapsed.
    pub looping: bool,
}

impl FrameTable {
    pub const fn looping(frame_count: usize, frame_duration_ms: u64) -> Self {
        Self {
            frame_count,
            frame_duration_us: frame_duration_ms * 1000,
            looping: true,
        }
    }

    pub const fn one_shot(frame_count: usize, frame_duration_ms: u64) -> Self {
        Self {
            frame_count,
            frame_duration_us: frame_duration_ms * 1000,
            looping: false,
        }
    }

    /// Total duration of one full cycle in microseconds.
    pub fn cycle_duration_us(&self) -> u64 {
        self.frame_duration_us * self.frame_count as u64
    }
}

/// Runtime animation state for one entity.
#[derive(Debug, Clone)]
pub struct AnimationClock<S> {
    state: S,
    frame_index: usize,
    last_advance_us: u64,
    finished: bool,
}

impl<S: Copy + PartialEq> AnimationClock<S> {
    pub fn new(state: S, now_us: u64) -> Self {
        Self {
            state,
            frame_index: 0,
            last_advance_us: now_us,
            finished: false,
        }
    }

    pub fn state(&self) -> S {
        self.state
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// True once a one-shot table has played through its last frame.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Switch to `state`. A different state always restarts at frame 0;
    /// re-entering the current state is a no-op.
    pub fn set_state(&mut self, state: S, now_us: u64) {
        if self.state != state {
            self.restart(state, now_us);
        }
    }

    /// Restart `state` from frame 0 even if it is already active.
    pub fn restart(&mut self, state: S, now_us: u64) {
        self.state = state;
        self.frame_index = 0;
        self.last_advance_us = now_us;
        self.finished = false;
    }

    /// Restart `state` from `frame`, for clips that pick up where a reversed
    /// clip left off. Out-of-range frames clamp on the next `advance`.
    pub fn restart_at(&mut self, state: S, frame: usize, now_us: u64) {
        self.restart(state, now_us);
        self.frame_index = frame;
    }

    /// Advance at most one frame if the table's frame duration has elapsed
    /// since the last advance. Returns the current frame index, always in
    /// `[0, frame_count)`.
    pub fn advance(&mut self, table: &FrameTable, now_us: u64) -> usize {
        if table.frame_count == 0 {
            return 0;
        }
        if self.frame_index >= table.frame_count {
            self.frame_index = table.frame_count - 1;
        }
        if self.finished {
            return self.frame_index;
        }

        if now_us.saturating_sub(self.last_advance_us) >= table.frame_duration_us {
            self.last_advance_us = now_us;
            if table.looping {
                self.frame_index = (self.frame_index + 1) % table.frame_count;
            } else if self.frame_index + 1 >= table.frame_count {
                self.finished = true;
            } else {
                self.frame_index += 1;
            }
        }

        self.frame_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Pose {
        Idle,
        Walk,
    }

    const IDLE: FrameTable = FrameTable::looping(7, 190);
    const ATTACK: FrameTable = FrameTable::one_shot(3, 150);

    #[test]
    fn advance_waits_for_frame_duration() {
        let mut clock = AnimationClock::new(Pose::Idle, 0);
        assert_eq!(clock.advance(&IDLE, 100_000), 0);
        assert_eq!(clock.advance(&IDLE, 189_999), 0);
        assert_eq!(clock.advance(&IDLE, 190_000), 1);
        // The timestamp resets on advance, so the next frame needs another 190ms.
        assert_eq!(clock.advance(&IDLE, 300_000), 1);
        assert_eq!(clock.advance(&IDLE, 380_000), 2);
    }

    #[test]
    fn looping_table_wraps_modulo_frame_count() {
        let mut clock = AnimationClock::new(Pose::Idle, 0);
        let mut now = 0;
        for expected in [1, 2, 3, 4, 5, 6, 0, 1] {
            now += IDLE.frame_duration_us;
            assert_eq!(clock.advance(&IDLE, now), expected);
        }
        assert!(!clock.finished());
    }

    #[test]
    fn frame_index_stays_in_range_and_is_monotonic_mod_count() {
        let table = FrameTable::looping(6, 125);
        let mut clock = AnimationClock::new(Pose::Walk, 0);
        let mut previous = 0;
        for step in 1..=100u64 {
            let frame = clock.advance(&table, step * 130_000);
            assert!(frame < table.frame_count);
            assert_eq!(frame, (previous + 1) % table.frame_count);
            previous = frame;
        }
    }

    #[test]
    fn one_shot_finishes_after_full_cycle() {
        let mut clock = AnimationClock::new(Pose::Walk, 0);
        assert_eq!(clock.advance(&ATTACK, 150_000), 1);
        assert_eq!(clock.advance(&ATTACK, 300_000), 2);
        assert!(!clock.finished());
        assert_eq!(clock.advance(&ATTACK, 450_000), 2);
        assert!(clock.finished());

        // Further ticks hold the last frame.
        assert_eq!(clock.advance(&ATTACK, 10_000_000), 2);
    }

    #[test]
    fn switching_state_resets_to_frame_zero() {
        let mut clock = AnimationClock::new(Pose::Idle, 0);
        clock.advance(&IDLE, 190_000);
        clock.advance(&IDLE, 380_000);
        assert_eq!(clock.frame_index(), 2);

        clock.set_state(Pose::Walk, 400_000);
        assert_eq!(clock.state(), Pose::Walk);
        assert_eq!(clock.frame_index(), 0);

        // Same state again does not reset.
        clock.advance(&IDLE, 600_000);
        clock.set_state(Pose::Walk, 650_000);
        assert_eq!(clock.frame_index(), 1);
    }

    #[test]
    fn restart_clears_finished_flag() {
        let mut clock = AnimationClock::new(Pose::Walk, 0);
        for t in 1..=3 {
            clock.advance(&ATTACK, t * 150_000);
        }
        assert!(clock.finished());
        clock.restart(Pose::Walk, 500_000);
        assert!(!clock.finished());
        assert_eq!(clock.frame_index(), 0);
    }

    #[test]
    fn restart_at_resumes_from_the_given_frame() {
        let table = FrameTable::one_shot(4, 100);
        let mut clock = AnimationClock::new(Pose::Walk, 0);
        clock.restart_at(Pose::Walk, 2, 0);
        assert_eq!(clock.frame_index(), 2);
        assert_eq!(clock.advance(&table, 100_000), 3);
        clock.advance(&table, 200_000);
        assert!(clock.finished());

        clock.restart_at(Pose::Walk, 9, 300_000);
        assert!(!clock.finished());
        assert_eq!(clock.advance(&table, 300_000), 3);
    }

    #[test]
    fn one_shot_cycle_duration_is_in_microseconds() {
        let table = FrameTable::one_shot(4, 100);
        assert!(!table.looping);
        assert_eq!(table.cycle_duration_us(), 400_000);
    }
}
