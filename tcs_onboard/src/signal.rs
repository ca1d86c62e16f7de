//! Signal-passed detection.
//!
//! The host only reports signals ahead. A signal has been passed when the
//! distance to the nearest signal jumps up while the train moves: the new
//! nearest signal is the one that used to be second.

use tcs_common::host::SignalObservation;

/// Minimum jump of the nearest-signal distance counted as a passage [m].
const PASSAGE_JUMP_M: f64 = 1.0;

/// A signal that vanishes from the sample closer than this was passed [m].
const LAST_SIGNAL_WINDOW_M: f64 = 50.0;

/// Keeps the previous nearest-signal sample.
#[derive(Debug, Clone, Default)]
pub struct SignalTracker {
    previous: Option<SignalObservation>,
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the nearest signal; returns the signal passed since the last
    /// tick, as it was last observed before passing it.
    pub fn update(
        &mut self,
        nearest: Option<&SignalObservation>,
        speed_mps: f64,
    ) -> Option<SignalObservation> {
        let passed = match (self.previous.as_ref(), nearest) {
            (Some(prev), Some(now)) => {
                let moving = speed_mps.abs() > 0.0;
                if moving && now.distance_m > prev.distance_m + PASSAGE_JUMP_M {
                    Some(prev.clone())
                } else {
                    None
                }
            }
            // Last signal of the route just passed.
            (Some(prev), None) if speed_mps.abs() > 0.0 && prev.distance_m < LAST_SIGNAL_WINDOW_M => {
                Some(prev.clone())
            }
            _ => None,
        };

        if let Some(p) = passed.as_ref() {
            tracing::debug!(aspect = ?p.aspect, "signal passed");
        }
        self.previous = nearest.cloned();
        passed
    }
}
