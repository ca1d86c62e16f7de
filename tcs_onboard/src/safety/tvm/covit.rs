//! COVIT: continuous overspeed supervision of the TVM.
//!
//! Emergency braking latches when the speed exceeds the block ceiling or a
//! signal is passed at danger, and releases only once the speed is back
//! under the unmargined reset speed. The gap between the two is the
//! hysteresis band.

use tcs_common::consts::{STANDSTILL_SPEED_MPS, kph_to_mps};
use tcs_common::tcs::state::TvmKind;

use super::table::TvmEntry;
use crate::curve::speed_curve;

/// Emergency ceiling and reset speed of a block [m/s].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockLimits {
    pub ceiling_mps: f64,
    pub reset_mps: f64,
}

impl BlockLimits {
    /// TVM300 applies the flat emergency speed of `Ve`. TVM430 additionally
    /// brakes towards the `Vc` emergency speed at the block end.
    pub fn compute(kind: TvmKind, entry: &TvmEntry, block_distance_m: f64, delay_s: f64) -> Self {
        let flat_ceiling = kph_to_mps(entry.emergency_ve_kph);
        let flat_reset = kph_to_mps(entry.reset_ve_kph());
        match kind {
            TvmKind::Tvm430 => {
                let decel = entry.deceleration_mps2;
                let curve = |target_kph: f64| {
                    speed_curve(block_distance_m, kph_to_mps(target_kph), 0.0, delay_s, decel)
                };
                Self {
                    ceiling_mps: flat_ceiling.min(curve(entry.emergency_vc_kph)),
                    reset_mps: flat_reset.min(curve(entry.reset_vc_kph())),
                }
            }
            TvmKind::Tvm300 | TvmKind::None => Self {
                ceiling_mps: flat_ceiling,
                reset_mps: flat_reset,
            },
        }
    }
}

/// Inputs for one COVIT tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CovitInputs {
    pub speed_mps: f64,
    pub armed: bool,
    /// Cab switch inhibiting overspeed supervision.
    pub inhibited: bool,
    /// A block marker with a stop entry speed was passed this tick.
    pub spad: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Covit {
    emergency: bool,
    spad: bool,
    last_reset_mps: f64,
}

impl Covit {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub const fn emergency_braking(&self) -> bool {
        self.emergency
    }

    #[inline]
    pub const fn spad(&self) -> bool {
        self.spad
    }

    /// Advance one tick against `limits`. Returns the emergency edge.
    pub fn update(&mut self, inputs: &CovitInputs, limits: &BlockLimits) -> Option<bool> {
        let speed = inputs.speed_mps.abs();
        self.last_reset_mps = limits.reset_mps;

        if inputs.spad && inputs.armed && !self.spad {
            tracing::warn!("TVM signal passed at danger");
            self.spad = true;
        }
        if self.spad && speed < STANDSTILL_SPEED_MPS {
            self.spad = false;
        }

        let overspeed = inputs.armed && !inputs.inhibited && speed > limits.ceiling_mps;
        let was = self.emergency;
        if overspeed || self.spad {
            if !self.emergency {
                tracing::warn!(
                    speed_mps = speed,
                    ceiling_mps = limits.ceiling_mps,
                    spad = self.spad,
                    "TVM emergency braking"
                );
            }
            self.emergency = true;
        } else if self.emergency && speed < self.last_reset_mps {
            tracing::info!("TVM emergency released under reset speed");
            self.emergency = false;
        }

        (was != self.emergency).then_some(self.emergency)
    }
}
