//! Braking-curve engine shared by KVB and TVM.
//!
//! The train is assumed to keep its speed `V` during `delay`, then to brake
//! at the constant effective deceleration `a'`:
//!
//! ```text
//! a' = a − g · declivity                       (declivity > 0 downhill)
//! d  = V · delay + (V² − v²) / (2 · a')
//! V  = sqrt(v² + (delay · a')² + 2 · a' · d) − delay · a'
//! ```
//!
//! The permitted speed never drops below the target speed `v`: a train
//! already at or under the target needs no braking at all.

use tcs_common::consts::{GRAVITY_MPS2, kph_to_mps};

/// Maximum instantaneous speed [m/s] from which the train still reaches
/// `target_speed_mps` at `target_distance_m`.
///
/// - `target_distance_m <= 0` → `target_speed_mps`
/// - `target_distance_m == +∞` → `+∞`
/// - effective deceleration `<= 0` → `target_speed_mps`
pub fn speed_curve(
    target_distance_m: f64,
    target_speed_mps: f64,
    declivity: f64,
    delay_s: f64,
    deceleration_mps2: f64,
) -> f64 {
    let target = if target_speed_mps.is_nan() {
        0.0
    } else {
        target_speed_mps.max(0.0)
    };

    if target_distance_m.is_nan() || target_distance_m <= 0.0 {
        return target;
    }
    if target_distance_m == f64::INFINITY {
        return f64::INFINITY;
    }

    let decel = deceleration_mps2 - GRAVITY_MPS2 * declivity;
    if !(decel > 0.0) {
        return target;
    }

    let delay = delay_s.max(0.0);
    let lag = delay * decel;
    let square = target * target + lag * lag + 2.0 * decel * target_distance_m;
    (square.sqrt() - lag).max(target)
}

/// Alert and emergency margins added on top of a supervised speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub alert_mps: f64,
    pub emergency_mps: f64,
}

impl Margins {
    pub const fn from_kph(alert_kph: f64, emergency_kph: f64) -> Self {
        Self {
            alert_mps: kph_to_mps(alert_kph),
            emergency_mps: kph_to_mps(emergency_kph),
        }
    }
}

/// Outcome of one supervised-speed comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Supervision {
    pub alert: bool,
    pub emergency: bool,
}

impl Supervision {
    /// Compare `speed` against separate alert and emergency limits (margins applied).
    #[inline]
    pub fn check(speed_mps: f64, alert_limit_mps: f64, emergency_limit_mps: f64, margins: Margins) -> Self {
        Self {
            alert: speed_mps > alert_limit_mps + margins.alert_mps,
            emergency: speed_mps > emergency_limit_mps + margins.emergency_mps,
        }
    }

    /// Compare against a single flat ceiling.
    #[inline]
    pub fn flat(speed_mps: f64, ceiling_mps: f64, margins: Margins) -> Self {
        Self::check(speed_mps, ceiling_mps, ceiling_mps, margins)
    }

    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            alert: self.alert || other.alert,
            emergency: self.emergency || other.emergency,
        }
    }
}
