//! Environmental hazards layered on top of a board
//!
//! Hazards run on the wall clock, not the simulation tick. The clock only
//! reports what should happen; the engine applies it.

/// Push garbage rows every `interval_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GarbageHazard {
    pub interval_ms: u32,
    pub lines: u8,
    pub holes: u8,
}

/// Hide the board for `duration_ms` every `interval_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlindHazard {
    pub interval_ms: u32,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HazardConfig {
    pub garbage: Option<GarbageHazard>,
    pub blind: Option<BlindHazard>,
}

impl HazardConfig {
    pub fn none() -> Self {
        Self::default()
    }

    /// One two-hole garbage row every four seconds
    pub fn scorching() -> Self {
        Self {
            garbage: Some(GarbageHazard {
                interval_ms: 4000,
                lines: 1,
                holes: 2,
            }),
            blind: None,
        }
    }

    /// Board goes dark for two seconds out of every ten
    pub fn blackout() -> Self {
        Self {
            garbage: None,
            blind: Some(BlindHazard {
                interval_ms: 10_000,
                duration_ms: 2000,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.garbage.is_none() && self.blind.is_none()
    }
}

/// What the hazards ask for after a clock advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HazardEffects {
    /// `(lines, holes)` to inject, summed over every elapsed interval
    pub garbage: Option<(u8, u8)>,
    pub hidden: bool,
}

/// Hazard timers driven by wall-clock advances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardClock {
    config: HazardConfig,
    garbage_elapsed_ms: u32,
    blind_elapsed_ms: u32,
    blind_remaining_ms: u32,
}

impl HazardClock {
    pub fn new(config: HazardConfig) -> Self {
        Self {
            config,
            garbage_elapsed_ms: 0,
            blind_elapsed_ms: 0,
            blind_remaining_ms: 0,
        }
    }

    pub fn config(&self) -> HazardConfig {
        self.config
    }

    pub fn hidden(&self) -> bool {
        self.blind_remaining_ms > 0
    }

    pub fn advance(&mut self, dt_ms: u32) -> HazardEffects {
        let mut effects = HazardEffects::default();

        if let Some(garbage) = self.config.garbage.filter(|g| g.interval_ms > 0) {
            self.garbage_elapsed_ms = self.garbage_elapsed_ms.saturating_add(dt_ms);
            let mut lines: u8 = 0;
            while self.garbage_elapsed_ms >= garbage.interval_ms {
                self.garbage_elapsed_ms -= garbage.interval_ms;
                lines = lines.saturating_add(garbage.lines);
            }
            if lines > 0 {
                effects.garbage = Some((lines, garbage.holes));
            }
        }

        if let Some(blind) = self.config.blind.filter(|b| b.interval_ms > 0) {
            self.blind_remaining_ms = self.blind_remaining_ms.saturating_sub(dt_ms);
            self.blind_elapsed_ms = self.blind_elapsed_ms.saturating_add(dt_ms);
            while self.blind_elapsed_ms >= blind.interval_ms {
                self.blind_elapsed_ms -= blind.interval_ms;
                self.blind_remaining_ms = blind.duration_ms;
            }
        }

        effects.hidden = self.hidden();
        effects
    }
}
