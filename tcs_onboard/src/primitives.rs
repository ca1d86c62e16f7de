//! Countdown, periodic and distance-triggered primitives.
//!
//! Every subsystem owns its primitives by value and advances them with the
//! per-tick delta supplied by the host. None of them reads a clock.
//!
//! Contract shared by [`Timer`] and [`OdoMeter`]:
//! - `setup()` configures the threshold and must precede the first `start()`.
//! - `start()` is idempotent while started.
//! - `stop()` clears the accumulator and the started flag.
//! - `triggered()` holds from the moment the accumulator reaches the
//!   threshold until the next `stop()`.

pub mod blinker;
pub mod odometer;
pub mod timer;

pub use blinker::Blinker;
pub use odometer::OdoMeter;
pub use timer::Timer;

use thiserror::Error;

/// Primitive misuse.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PrimitiveError {
    /// Threshold negative, zero where forbidden, or not finite.
    #[error("invalid primitive threshold: {0}")]
    InvalidThreshold(f64),
}

/// Accumulator shared by the time- and distance-driven primitives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Accumulator {
    threshold: Option<f64>,
    value: f64,
    started: bool,
}

impl Accumulator {
    pub(crate) const fn configured(threshold: f64) -> Self {
        Self {
            threshold: Some(threshold),
            value: 0.0,
            started: false,
        }
    }

    pub(crate) fn setup(&mut self, threshold: f64) -> Result<(), PrimitiveError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(PrimitiveError::InvalidThreshold(threshold));
        }
        self.threshold = Some(threshold);
        Ok(())
    }

    #[inline]
    pub(crate) const fn is_configured(&self) -> bool {
        self.threshold.is_some()
    }

    /// Returns whether the accumulator is running after the call.
    pub(crate) fn start(&mut self) -> bool {
        if self.threshold.is_none() {
            return false;
        }
        if !self.started {
            self.started = true;
            self.value = 0.0;
        }
        true
    }

    pub(crate) fn stop(&mut self) {
        self.started = false;
        self.value = 0.0;
    }

    pub(crate) fn advance(&mut self, delta: f64) {
        if self.started && delta.is_finite() && delta > 0.0 {
            self.value += delta;
        }
    }

    #[inline]
    pub(crate) const fn started(&self) -> bool {
        self.started
    }

    #[inline]
    pub(crate) const fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn triggered(&self) -> bool {
        match self.threshold {
            Some(t) => self.started && self.value >= t,
            None => false,
        }
    }

    pub(crate) fn remaining(&self) -> f64 {
        match self.threshold {
            Some(t) if self.started => (t - self.value).max(0.0),
            Some(t) => t,
            None => 0.0,
        }
    }
}
