//! Optical signal repetition (RSO).
//!
//! Passing a closed signal lights the cab lamp and starts an acknowledgement
//! countdown. Pressing the acknowledge button fixes the lamp and cancels the
//! countdown; otherwise the countdown latches emergency braking until the
//! driver rearms. An acknowledge button already held when the signal is met
//! does not count: it has to be released and pressed again.

use tcs_common::host::SignalObservation;
use tcs_common::tcs::config::RsoConfig;
use tcs_common::tcs::state::RsoState;

use crate::primitives::{Blinker, Timer};

/// Conditions that suppress new triggers. Re-evaluated every tick; they never
/// clear an emergency already latched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RsoInhibition {
    /// Cab running reversed.
    pub direction_reversed: bool,
    /// KVB in high-speed-line mode with TVM armed.
    pub kvb_tvm_joint: bool,
    /// TVM armed with overspeed supervision active.
    pub tvm_covit_active: bool,
}

impl RsoInhibition {
    #[inline]
    pub const fn any(&self) -> bool {
        self.direction_reversed || self.kvb_tvm_joint || self.tvm_covit_active
    }
}

/// Inputs for one RSO tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsoInputs<'a> {
    pub passed: Option<&'a SignalObservation>,
    pub acknowledge: bool,
    pub cancel: bool,
    pub rearm: bool,
    pub inhibition: RsoInhibition,
}

/// RSO subsystem state.
#[derive(Debug, Clone)]
pub struct Rso {
    state: RsoState,
    emergency_timer: Timer,
    blinker: Blinker,
    emergency: bool,
}

impl Rso {
    pub fn new(config: &RsoConfig) -> Self {
        Self {
            state: RsoState::Init,
            emergency_timer: Timer::new(config.emergency_delay_s),
            blinker: Blinker::new(config.blink_frequency_hz),
            emergency: false,
        }
    }

    #[inline]
    pub const fn state(&self) -> RsoState {
        self.state
    }

    #[inline]
    pub const fn emergency_braking(&self) -> bool {
        self.emergency
    }

    /// Cab lamp: blinking while waiting for acknowledgement, steady once
    /// triggered otherwise.
    pub fn lamp_on(&self) -> bool {
        match self.state {
            RsoState::Init | RsoState::Off => false,
            RsoState::TriggeredBlinking => self.blinker.on(),
            RsoState::TriggeredPressed | RsoState::TriggeredFixed => true,
        }
    }

    /// Advance one tick. Returns the new state when it changed.
    pub fn update(&mut self, inputs: &RsoInputs<'_>, elapsed_s: f64) -> Option<RsoState> {
        self.emergency_timer.update(elapsed_s);
        self.blinker.update(elapsed_s);

        let aspect = inputs.passed.map(|s| s.aspect);
        let closed = aspect.is_some_and(|a| a.is_closed()) && !inputs.inhibition.any();
        let opened = aspect.is_some_and(|a| a.is_opened());
        let release = opened || inputs.cancel;

        let mut next = match self.state {
            RsoState::Init => RsoState::Off,
            RsoState::Off | RsoState::TriggeredFixed if closed => Self::trigger(inputs.acknowledge),
            RsoState::Off => RsoState::Off,
            RsoState::TriggeredFixed if release => RsoState::Off,
            RsoState::TriggeredFixed => RsoState::TriggeredFixed,
            RsoState::TriggeredPressed | RsoState::TriggeredBlinking if release => RsoState::Off,
            RsoState::TriggeredPressed if !inputs.acknowledge => RsoState::TriggeredBlinking,
            RsoState::TriggeredPressed => RsoState::TriggeredPressed,
            RsoState::TriggeredBlinking if inputs.acknowledge => RsoState::TriggeredFixed,
            RsoState::TriggeredBlinking => RsoState::TriggeredBlinking,
        };

        self.apply_timers(next);

        if self.emergency_timer.triggered() && !self.emergency {
            tracing::warn!("RSO acknowledgement timeout, emergency braking");
            self.emergency = true;
        }

        if inputs.rearm && self.emergency {
            tracing::info!("RSO emergency rearmed");
            self.emergency = false;
            // Rearming while still waiting counts as acknowledgement.
            if matches!(next, RsoState::TriggeredPressed | RsoState::TriggeredBlinking) {
                next = RsoState::TriggeredFixed;
            }
            self.apply_timers(next);
            self.emergency_timer.stop();
        }

        if next == self.state {
            return None;
        }
        tracing::debug!(from = ?self.state, to = ?next, "RSO transition");
        self.state = next;
        Some(next)
    }

    fn trigger(acknowledge_held: bool) -> RsoState {
        if acknowledge_held {
            RsoState::TriggeredPressed
        } else {
            RsoState::TriggeredBlinking
        }
    }

    fn apply_timers(&mut self, next: RsoState) {
        match next {
            RsoState::TriggeredPressed | RsoState::TriggeredBlinking => {
                if !self.state_waits() {
                    self.emergency_timer.stop();
                }
                self.emergency_timer.start();
            }
            _ => self.emergency_timer.stop(),
        }
        if next == RsoState::TriggeredBlinking {
            self.blinker.start();
        } else {
            self.blinker.stop();
        }
    }

    const fn state_waits(&self) -> bool {
        matches!(
            self.state,
            RsoState::TriggeredPressed | RsoState::TriggeredBlinking
        )
    }
}
