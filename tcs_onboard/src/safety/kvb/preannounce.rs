//! Pre-announce token allowing KVB supervision above 160 km/h.
//!
//! Deactivated → Armed → Triggered → Execution160 → Deactivated. The token
//! only raises the KVB ceiling from 160 to 220 km/h; it never exceeds the
//! train speed limit.

use tcs_common::consts::{
    KVB_PREANNOUNCE_CEILING_KPH, KVB_PREANNOUNCE_DISTANCE_M, KVB_PREANNOUNCE_THRESHOLD_KPH,
    kph_to_mps,
};
use tcs_common::tcs::state::PreAnnounce;

use super::target::Target;

/// Inputs for one pre-announce tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PreAnnounceInputs {
    pub line_speed_mps: f64,
    /// Execution speed of the last field, train limit when unconstrained.
    pub signal_speed_mps: f64,
    /// Distance to the next restriction to 160 km/h or below.
    pub restriction_m: Option<f64>,
    /// Field announcing 160 km/h at the next signal read this tick.
    pub onset_passed: bool,
    /// Signal executing the restriction passed this tick.
    pub restriction_passed: bool,
    /// Clear field read this tick.
    pub clear_field: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PreAnnounceToken {
    state: PreAnnounce,
    restriction_m: Option<f64>,
}

impl PreAnnounceToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub const fn state(&self) -> PreAnnounce {
        self.state
    }

    /// Ceiling allowed by the token, capped by `train_limit_mps`.
    pub fn ceiling_mps(&self, train_limit_mps: f64) -> f64 {
        let kph = match self.state {
            PreAnnounce::Armed | PreAnnounce::Triggered => KVB_PREANNOUNCE_CEILING_KPH,
            PreAnnounce::Deactivated | PreAnnounce::Execution160 => KVB_PREANNOUNCE_THRESHOLD_KPH,
        };
        kph_to_mps(kph).min(train_limit_mps)
    }

    /// Braking target towards the 160 km/h restriction while triggered.
    pub fn target(&self) -> Option<Target> {
        match (self.state, self.restriction_m) {
            (PreAnnounce::Triggered, Some(distance_m)) => Some(Target {
                distance_m,
                speed_mps: kph_to_mps(KVB_PREANNOUNCE_THRESHOLD_KPH),
            }),
            _ => None,
        }
    }

    /// Advance one tick. Returns the new state when it changed.
    pub fn update(&mut self, inputs: &PreAnnounceInputs) -> Option<PreAnnounce> {
        let threshold = kph_to_mps(KVB_PREANNOUNCE_THRESHOLD_KPH);
        let fast_line = inputs.line_speed_mps > threshold && inputs.signal_speed_mps > threshold;
        let near = inputs
            .restriction_m
            .is_some_and(|d| d < KVB_PREANNOUNCE_DISTANCE_M);
        self.restriction_m = inputs.restriction_m;

        let next = match self.state {
            PreAnnounce::Deactivated if fast_line && !near => PreAnnounce::Armed,
            PreAnnounce::Deactivated => PreAnnounce::Deactivated,
            PreAnnounce::Armed if inputs.onset_passed || near => PreAnnounce::Triggered,
            PreAnnounce::Armed if !fast_line => PreAnnounce::Deactivated,
            PreAnnounce::Armed => PreAnnounce::Armed,
            PreAnnounce::Triggered if inputs.restriction_passed => PreAnnounce::Execution160,
            PreAnnounce::Triggered => PreAnnounce::Triggered,
            PreAnnounce::Execution160 if inputs.clear_field => PreAnnounce::Deactivated,
            PreAnnounce::Execution160 => PreAnnounce::Execution160,
        };
        if next == self.state {
            return None;
        }
        tracing::debug!(from = ?self.state, to = ?next, "KVB pre-announce");
        self.state = next;
        Some(next)
    }
}
