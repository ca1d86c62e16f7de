//! Periodic 50 % duty square wave.

use super::{Accumulator, PrimitiveError};

/// Square wave for blinking lamps, driven by elapsed time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Blinker {
    frequency_hz: f64,
    acc: Accumulator,
}

impl Blinker {
    pub fn new(frequency_hz: f64) -> Self {
        let mut blinker = Self::default();
        if let Err(e) = blinker.setup(frequency_hz) {
            tracing::warn!(error = %e, "blinker left unconfigured");
        }
        blinker
    }

    /// Configure the blink frequency [Hz]. Must be strictly positive.
    pub fn setup(&mut self, frequency_hz: f64) -> Result<(), PrimitiveError> {
        if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
            return Err(PrimitiveError::InvalidThreshold(frequency_hz));
        }
        self.acc.setup(1.0 / frequency_hz)?;
        self.frequency_hz = frequency_hz;
        Ok(())
    }

    pub fn start(&mut self) {
        self.acc.start();
    }

    pub fn stop(&mut self) {
        self.acc.stop();
    }

    #[inline]
    pub fn update(&mut self, elapsed_s: f64) {
        self.acc.advance(elapsed_s);
    }

    #[inline]
    pub const fn started(&self) -> bool {
        self.acc.started()
    }

    /// Current phase: on during the first half of each period, off while stopped.
    pub fn on(&self) -> bool {
        if !self.acc.started() {
            return false;
        }
        (self.acc.value() * self.frequency_hz).fract() < 0.5
    }
}
