//! KVB supervision targets.
//!
//! A target is a point ahead where the speed must have dropped to a given
//! value. The stop target is latched from a V0 field and followed by
//! odometer; restriction targets are re-acquired every tick from the
//! signals and speed post the host reports.

use tcs_common::consts::MAX_SIGNALS_AHEAD;
use tcs_common::host::{SignalObservation, SpeedPostObservation};

use super::field::{ReleaseSpeed, release_of};
use crate::primitives::OdoMeter;

/// A point ahead to reach at `speed_mps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub distance_m: f64,
    pub speed_mps: f64,
}

/// Stop target followed by odometer from the moment it was set.
#[derive(Debug, Clone)]
pub struct StopTarget {
    odometer: OdoMeter,
    release: ReleaseSpeed,
}

impl StopTarget {
    /// Stop target `distance_m` ahead.
    pub fn new(distance_m: f64, release: ReleaseSpeed) -> Self {
        let mut odometer = OdoMeter::new(distance_m.max(0.0));
        odometer.start();
        Self { odometer, release }
    }

    /// Place the stop on the next stop-capable signal within the signals
    /// ahead. Without one, the end of authority is a buffer stop (V10);
    /// without that either the nearest signal is used.
    pub fn acquire(signals: &[SignalObservation], end_of_authority_m: Option<f64>) -> Option<Self> {
        let window = &signals[..signals.len().min(MAX_SIGNALS_AHEAD)];
        if let Some(stop) = window.iter().find(|s| s.aspect.is_stop()) {
            return Some(Self::new(stop.distance_m, release_of(stop)));
        }
        if let Some(eoa) = end_of_authority_m {
            return Some(Self::new(eoa, ReleaseSpeed::V10));
        }
        let nearest = window.first()?;
        tracing::debug!(distance_m = nearest.distance_m, "no stop signal ahead, stop on nearest");
        Some(Self::new(nearest.distance_m, release_of(nearest)))
    }

    /// Advance by the distance travelled this tick.
    pub fn update(&mut self, distance_m: f64) {
        self.odometer.update(distance_m);
    }

    #[inline]
    pub fn remaining_m(&self) -> f64 {
        self.odometer.remaining_m()
    }

    #[inline]
    pub const fn release(&self) -> ReleaseSpeed {
        self.release
    }

    pub fn target(&self) -> Target {
        Target {
            distance_m: self.remaining_m(),
            speed_mps: 0.0,
        }
    }
}

/// Nearest signal within range carrying a limit below the train limit.
pub fn restriction(signals: &[SignalObservation], train_limit_mps: f64) -> Option<Target> {
    signals
        .iter()
        .take(MAX_SIGNALS_AHEAD)
        .filter_map(|s| {
            let limit = s.speed_limit_mps?;
            (limit < train_limit_mps).then_some(Target {
                distance_m: s.distance_m,
                speed_mps: limit,
            })
        })
        .next()
}

/// Line-speed drop announced by the next speed post.
pub fn line_speed_change(post: Option<&SpeedPostObservation>, line_speed_mps: f64) -> Option<Target> {
    let post = post?;
    (post.limit_mps < line_speed_mps).then_some(Target {
        distance_m: post.distance_m,
        speed_mps: post.limit_mps,
    })
}
