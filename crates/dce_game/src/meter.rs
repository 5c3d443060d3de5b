/// A bounded counter for health and magic. `current` never leaves
/// `[0, total]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meter {
    current: u32,
    total: u32,
}

impl Meter {
    pub const fn full(total: u32) -> Self {
        Self {
            current: total,
            total,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Returns the amount actually removed.
    pub fn subtract(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.current);
        self.current -= removed;
        removed
    }

    pub fn as_pair(&self) -> (u32, u32) {
        (self.current, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtract_clamps_at_zero() {
        let mut meter = Meter::full(2);
        assert_eq!(meter.subtract(5), 2);
        assert_eq!(meter.current(), 0);
        assert!(meter.is_empty());
        assert_eq!(meter.subtract(1), 0);
    }

    #[test]
    fn as_pair_reports_current_and_total() {
        let mut meter = Meter::full(5);
        meter.subtract(3);
        assert_eq!(meter.as_pair(), (2, 5));
    }

    #[test]
    fn current_stays_in_range_for_any_sequence() {
        let mut meter = Meter::full(4);
        for step in 0..50u32 {
            let before = meter.current();
            let removed = meter.subtract(step % 4);
            assert_eq!(meter.current(), before - removed);
            assert!(meter.current() <= meter.as_pair().1);
        }
    }
}
