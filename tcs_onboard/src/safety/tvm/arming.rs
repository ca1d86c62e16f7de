//! TVM arming sub-state.
//!
//! Armed automatically when the line speed crosses 221 km/h upward and
//! disarmed when it falls to 220 km/h, by `TVM_ARM` / `TVM_DISARM` beacons,
//! by the cab buttons, or by the leading unit.

use tcs_common::consts::{HSL_ENTRY_THRESHOLD_KPH, HSL_EXIT_THRESHOLD_KPH, kph_to_mps};
use tcs_common::tcs::state::TvmArming;

/// Beacon tag arming the TVM.
pub const ARM_TAG: &str = "TVM_ARM";
/// Beacon tag disarming the TVM.
pub const DISARM_TAG: &str = "TVM_DISARM";

/// Arming requests sampled for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArmingInputs {
    pub line_speed_mps: f64,
    pub arm_beacon: bool,
    pub disarm_beacon: bool,
    pub arm_button: bool,
    pub disarm_button: bool,
    /// Order relayed by the leading unit.
    pub remote: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ArmingMachine {
    state: TvmArming,
    previous_line_mps: Option<f64>,
}

impl ArmingMachine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub const fn state(&self) -> TvmArming {
        self.state
    }

    #[inline]
    pub const fn is_armed(&self) -> bool {
        matches!(self.state, TvmArming::Armed)
    }

    /// Advance one tick. Returns the new state when it changed.
    ///
    /// Arming requests win over disarming requests in the same tick.
    pub fn update(&mut self, inputs: &ArmingInputs) -> Option<TvmArming> {
        let entry = kph_to_mps(HSL_ENTRY_THRESHOLD_KPH);
        let exit = kph_to_mps(HSL_EXIT_THRESHOLD_KPH);
        let line = inputs.line_speed_mps;
        let (rising, falling) = match self.previous_line_mps {
            Some(prev) => (prev < entry && line >= entry, prev > exit && line <= exit),
            None => (line >= entry, false),
        };
        self.previous_line_mps = Some(line);

        let arm = rising || inputs.arm_beacon || inputs.arm_button || inputs.remote == Some(true);
        let disarm =
            falling || inputs.disarm_beacon || inputs.disarm_button || inputs.remote == Some(false);

        let next = if arm {
            TvmArming::Armed
        } else if disarm {
            TvmArming::Disarmed
        } else {
            self.state
        };
        if next == self.state {
            return None;
        }
        tracing::info!(from = ?self.state, to = ?next, "TVM arming changed");
        self.state = next;
        Some(next)
    }
}
