//! Player-facing HUD values published by the simulation each tick.

/// Widest meter the HUD draws, in pips.
pub const MAX_PIPS: usize = 20;

/// Snapshot of everything the HUD draws. Produced by the game tick, read by
/// the overlay; the overlay never mutates game state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HudStatus {
    pub health: (u32, u32),
    pub magic: (u32, u32),
    pub game_over: bool,
    pub interaction_message: Option<String>,
}

impl HudStatus {
    pub fn health_label(&self) -> String {
        format!("Health {}/{}", self.health.0, self.health.1)
    }

    pub fn magic_label(&self) -> String {
        format!("Magic {}/{}", self.magic.0, self.magic.1)
    }

    /// One filled pip per point, hollow pips for the rest of the meter.
    /// Meters longer than [`MAX_PIPS`] are scaled down to that width, with
    /// any nonzero value showing at least one filled pip.
    pub fn pips(current: u32, total: u32) -> String {
        let current = current.min(total);
        let (filled, width) = if total as usize <= MAX_PIPS {
            (current as usize, total as usize)
        } else {
            let scaled = (current as u64 * MAX_PIPS as u64).div_ceil(total as u64);
            (scaled as usize, MAX_PIPS)
        };
        let empty = width - filled;
        format!("{}{}", "\u{25a0}".repeat(filled), "\u{25a1}".repeat(empty))
    }
}
