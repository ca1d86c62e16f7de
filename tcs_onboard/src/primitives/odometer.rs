//! Distance-triggered countdown.

use super::{Accumulator, PrimitiveError};

/// Like [`Timer`](super::Timer) but driven by distance travelled.
///
/// Only forward progress accumulates; the host reports travelled distance
/// as a non-negative delta.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OdoMeter {
    acc: Accumulator,
}

impl OdoMeter {
    pub fn new(distance_m: f64) -> Self {
        let mut odo = Self::default();
        if let Err(e) = odo.setup(distance_m) {
            tracing::warn!(error = %e, "odometer left unconfigured");
        }
        odo
    }

    /// Configure the trigger distance [m].
    pub fn setup(&mut self, distance_m: f64) -> Result<(), PrimitiveError> {
        self.acc.setup(distance_m)
    }

    #[inline]
    pub const fn is_configured(&self) -> bool {
        self.acc.is_configured()
    }

    pub fn start(&mut self) {
        self.acc.start();
    }

    pub fn stop(&mut self) {
        self.acc.stop();
    }

    /// Advance by the distance travelled this tick [m].
    #[inline]
    pub fn update(&mut self, distance_m: f64) {
        self.acc.advance(distance_m);
    }

    #[inline]
    pub const fn started(&self) -> bool {
        self.acc.started()
    }

    #[inline]
    pub fn triggered(&self) -> bool {
        self.acc.triggered()
    }

    /// Distance travelled since start [m].
    #[inline]
    pub const fn travelled_m(&self) -> f64 {
        self.acc.value()
    }

    #[inline]
    pub fn remaining_m(&self) -> f64 {
        self.acc.remaining()
    }
}
