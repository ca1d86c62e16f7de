//! Elapsed-time countdown.

use super::{Accumulator, PrimitiveError};

/// Countdown driven by the host's elapsed time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timer {
    acc: Accumulator,
}

impl Timer {
    /// Timer already configured with `duration_s`.
    ///
    /// Non-finite or negative durations leave the timer unconfigured.
    pub fn new(duration_s: f64) -> Self {
        let mut timer = Self::default();
        if let Err(e) = timer.setup(duration_s) {
            tracing::warn!(error = %e, "timer left unconfigured");
        }
        timer
    }

    /// Configure the trigger duration [s].
    pub fn setup(&mut self, duration_s: f64) -> Result<(), PrimitiveError> {
        self.acc.setup(duration_s)
    }

    #[inline]
    pub const fn is_configured(&self) -> bool {
        self.acc.is_configured()
    }

    /// Start counting. No effect while already started, or before `setup()`.
    pub fn start(&mut self) {
        self.acc.start();
    }

    /// Stop and reset the elapsed time.
    pub fn stop(&mut self) {
        self.acc.stop();
    }

    /// Advance by `elapsed_s` if started.
    #[inline]
    pub fn update(&mut self, elapsed_s: f64) {
        self.acc.advance(elapsed_s);
    }

    #[inline]
    pub const fn started(&self) -> bool {
        self.acc.started()
    }

    #[inline]
    pub fn triggered(&self) -> bool {
        self.acc.triggered()
    }

    #[inline]
    pub const fn elapsed_s(&self) -> f64 {
        self.acc.value()
    }

    /// Time left before triggering [s].
    #[inline]
    pub fn remaining_s(&self) -> f64 {
        self.acc.remaining()
    }
}
