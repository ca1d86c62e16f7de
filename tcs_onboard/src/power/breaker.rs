//! Circuit-breaker / traction-relay state machine.
//!
//! Open → Closing → Closed, gated by a closing authorisation recomputed every
//! tick. A closing order must be held with authorisation for the whole
//! closing delay; any interruption aborts back to Open. Each order closes
//! the breaker at most once: after reaching Closed the order has to be
//! released before it counts again.

use tcs_common::tcs::state::{BreakerState, PowerSupplyKind};

use crate::primitives::Timer;

/// Inputs sampled for one breaker tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreakerInputs {
    pub driver_closing_order: bool,
    pub driver_opening_order: bool,
    pub tcs_closing_order: bool,
    pub tcs_opening_order: bool,
    /// Result of [`closing_authorization`] for this tick.
    pub closing_authorization: bool,
    /// Keeps the breaker closed when authorisation drops.
    pub service_retention: bool,
}

impl BreakerInputs {
    #[inline]
    const fn closing_order(&self) -> bool {
        self.driver_closing_order || self.tcs_closing_order
    }

    #[inline]
    const fn opening_order(&self) -> bool {
        self.driver_opening_order || self.tcs_opening_order
    }
}

/// Closing authorisation for this tick. Never sticky.
///
/// Requires the TCS and the driver to authorise, and the power source to be
/// available: pantograph up (electric), engine running (diesel), either
/// (dual-mode).
pub const fn closing_authorization(
    kind: PowerSupplyKind,
    tcs_authorization: bool,
    driver_authorization: bool,
    pantograph_up: bool,
    diesel_engine_running: bool,
) -> bool {
    let source_ok = match kind {
        PowerSupplyKind::Electric => pantograph_up,
        PowerSupplyKind::Diesel => diesel_engine_running,
        PowerSupplyKind::DualMode => pantograph_up || diesel_engine_running,
    };
    tcs_authorization && driver_authorization && source_ok
}

/// Breaker state machine owned by one unit.
#[derive(Debug, Clone)]
pub struct BreakerMachine {
    state: BreakerState,
    closing_timer: Timer,
    /// The closing order currently held already closed the breaker once.
    order_consumed: bool,
}

impl BreakerMachine {
    /// New machine in `Open` state.
    pub fn new(closing_delay_s: f64) -> Self {
        Self {
            state: BreakerState::Open,
            closing_timer: Timer::new(closing_delay_s),
            order_consumed: false,
        }
    }

    #[inline]
    pub const fn state(&self) -> BreakerState {
        self.state
    }

    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, BreakerState::Closed)
    }

    /// Advance one tick. Returns the new state when it changed.
    pub fn update(&mut self, inputs: &BreakerInputs, elapsed_s: f64) -> Option<BreakerState> {
        if !inputs.closing_order() {
            self.order_consumed = false;
        }

        let next = match self.state {
            BreakerState::Open => {
                if inputs.closing_authorization
                    && inputs.closing_order()
                    && !inputs.opening_order()
                    && !self.order_consumed
                {
                    self.closing_timer.stop();
                    self.closing_timer.start();
                    BreakerState::Closing
                } else {
                    BreakerState::Open
                }
            }
            BreakerState::Closing => {
                if !inputs.closing_authorization
                    || !inputs.closing_order()
                    || inputs.opening_order()
                {
                    self.closing_timer.stop();
                    BreakerState::Open
                } else {
                    self.closing_timer.update(elapsed_s);
                    if self.closing_timer.triggered() {
                        self.closing_timer.stop();
                        self.order_consumed = true;
                        BreakerState::Closed
                    } else {
                        BreakerState::Closing
                    }
                }
            }
            BreakerState::Closed => {
                if inputs.opening_order()
                    || (!inputs.closing_authorization && !inputs.service_retention)
                {
                    BreakerState::Open
                } else {
                    BreakerState::Closed
                }
            }
        };

        if next == self.state {
            return None;
        }
        tracing::info!(from = ?self.state, to = ?next, "breaker transition");
        self.state = next;
        Some(next)
    }
}
