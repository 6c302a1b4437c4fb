/// Nominal length of the cosmetic retrieval phase.
pub const RETRIEVAL_NOMINAL_MS: u64 = 2_000;
/// Nominal length of the generation ramp; the real request usually outlives it.
pub const GENERATION_NOMINAL_MS: u64 = 8_000;
/// Generation progress never reaches 100% before the response arrives.
pub const GENERATION_CAP_PERCENT: u8 = 95;

/// Time-based progress ramp, advanced by UI ticks.
///
/// Not tied to any backend signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRamp {
    nominal_ms: u64,
    cap_percent: u8,
    elapsed_ms: u64,
}

impl ProgressRamp {
    pub fn new(nominal_ms: u64, cap_percent: u8) -> Self {
        Self {
            nominal_ms: nominal_ms.max(1),
            cap_percent: cap_percent.min(100),
            elapsed_ms: 0,
        }
    }

    pub fn retrieval() -> Self {
        Self::new(RETRIEVAL_NOMINAL_MS, 100)
    }

    pub fn generation() -> Self {
        Self::new(GENERATION_NOMINAL_MS, GENERATION_CAP_PERCENT)
    }

    pub fn advance(&mut self, elapsed_ms: u64) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms);
    }

    pub fn percent(&self) -> u8 {
        let raw = self.elapsed_ms.saturating_mul(100) / self.nominal_ms;
        raw.min(u64::from(self.cap_percent)) as u8
    }

    pub fn remaining_ms(&self) -> u64 {
        self.nominal_ms.saturating_sub(self.elapsed_ms)
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_ms >= self.nominal_ms
    }
}
