//! Conventional / high-speed line mode selection.
//!
//! High-speed mode is entered once the line speed has stayed at or above
//! 221 km/h for 200 m, and left once it has stayed at or below 220 km/h for
//! 450 m. Any interruption restarts the distance count.

use tcs_common::consts::{
    HSL_ENTRY_DISTANCE_M, HSL_ENTRY_THRESHOLD_KPH, HSL_EXIT_DISTANCE_M, HSL_EXIT_THRESHOLD_KPH,
    kph_to_mps,
};
use tcs_common::tcs::state::KvbMode;

use crate::primitives::OdoMeter;

#[derive(Debug, Clone)]
pub struct ModeSelector {
    mode: KvbMode,
    entry: OdoMeter,
    exit: OdoMeter,
}

impl Default for ModeSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeSelector {
    pub fn new() -> Self {
        Self {
            mode: KvbMode::ConventionalLine,
            entry: OdoMeter::new(HSL_ENTRY_DISTANCE_M),
            exit: OdoMeter::new(HSL_EXIT_DISTANCE_M),
        }
    }

    #[inline]
    pub const fn mode(&self) -> KvbMode {
        self.mode
    }

    #[inline]
    pub const fn is_high_speed(&self) -> bool {
        matches!(self.mode, KvbMode::HighSpeedLine)
    }

    /// High-speed mode with the line speed already at or below the exit
    /// threshold, counting down the exit distance.
    #[inline]
    pub const fn leaving(&self) -> bool {
        self.is_high_speed() && self.exit.started()
    }

    /// Advance by `distance_m` at `line_speed_mps`. Returns the new mode
    /// when it changed.
    pub fn update(&mut self, line_speed_mps: f64, distance_m: f64) -> Option<KvbMode> {
        let (odometer, condition, target) = match self.mode {
            KvbMode::ConventionalLine => (
                &mut self.entry,
                line_speed_mps >= kph_to_mps(HSL_ENTRY_THRESHOLD_KPH),
                KvbMode::HighSpeedLine,
            ),
            KvbMode::HighSpeedLine => (
                &mut self.exit,
                line_speed_mps <= kph_to_mps(HSL_EXIT_THRESHOLD_KPH),
                KvbMode::ConventionalLine,
            ),
        };

        if !condition {
            odometer.stop();
            return None;
        }
        odometer.start();
        odometer.update(distance_m);
        if !odometer.triggered() {
            return None;
        }

        odometer.stop();
        tracing::info!(from = ?self.mode, to = ?target, "KVB mode change");
        self.mode = target;
        Some(target)
    }
}
