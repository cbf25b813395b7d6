use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts countable relay turns and decides when an ad is due.
#[derive(Debug, Default)]
pub struct Cadence {
    turns: AtomicU64,
}

impl Cadence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one turn. Returns true when ads are enabled and this turn lands
    /// on a multiple of `frequency`.
    pub fn tick(&self, enabled: bool, frequency: NonZeroU32) -> bool {
        let turn = self.turns.fetch_add(1, Ordering::Relaxed) + 1;
        enabled && turn % u64::from(frequency.get()) == 0
    }

    pub fn turns(&self) -> u64 {
        self.turns.load(Ordering::Relaxed)
    }
}
