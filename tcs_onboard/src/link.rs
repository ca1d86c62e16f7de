//! Inter-unit link of a multiple-unit consist.
//!
//! One outbound slot per tick, no queue. The leader relays state changes
//! through [`LeaderRelay`], which posts at most one pending change per tick
//! in priority order and retries the rest on the following ticks.

use thiserror::Error;

use tcs_common::tcs::message::{BreakerOrder, UnitMessage};

/// Link misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The slot already holds a message for this tick.
    #[error("inter-unit slot busy with {0:?}")]
    Busy(UnitMessage),
}

/// Single-slot outbound channel.
#[derive(Debug, Clone, Default)]
pub struct InterUnitLink {
    slot: Option<UnitMessage>,
}

impl InterUnitLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post `message` for this tick.
    pub fn post(&mut self, message: UnitMessage) -> Result<(), LinkError> {
        match self.slot {
            Some(pending) => Err(LinkError::Busy(pending)),
            None => {
                self.slot = Some(message);
                Ok(())
            }
        }
    }

    #[inline]
    pub const fn is_busy(&self) -> bool {
        self.slot.is_some()
    }

    /// Collect the message of this tick and free the slot.
    pub fn take(&mut self) -> Option<UnitMessage> {
        self.slot.take()
    }
}

/// State the leader mirrors to its followers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayedState {
    pub emergency_brake: bool,
    pub breaker: BreakerOrder,
    pub pantograph_up: bool,
    pub tvm_armed: bool,
}

impl Default for RelayedState {
    fn default() -> Self {
        Self {
            emergency_brake: false,
            breaker: BreakerOrder::Open,
            pantograph_up: true,
            tvm_armed: false,
        }
    }
}

/// Tracks what followers have been told.
#[derive(Debug, Clone, Default)]
pub struct LeaderRelay {
    sent: RelayedState,
}

impl LeaderRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// State followers are known to have received.
    #[inline]
    pub const fn sent(&self) -> &RelayedState {
        &self.sent
    }

    /// Post the most urgent unsent change of `current` on `link`.
    pub fn relay(&mut self, current: &RelayedState, link: &mut InterUnitLink) {
        let Some(message) = self.next_change(current) else {
            return;
        };
        match link.post(message) {
            Ok(()) => self.mark_sent(message),
            Err(e) => tracing::debug!(error = %e, "relay deferred"),
        }
    }

    fn next_change(&self, current: &RelayedState) -> Option<UnitMessage> {
        let sent = &self.sent;
        if current.emergency_brake != sent.emergency_brake {
            Some(UnitMessage::EmergencyBrake(current.emergency_brake))
        } else if current.breaker != sent.breaker {
            Some(UnitMessage::BreakerOrder(current.breaker))
        } else if current.pantograph_up != sent.pantograph_up {
            Some(UnitMessage::PantographOrder(current.pantograph_up))
        } else if current.tvm_armed != sent.tvm_armed {
            Some(UnitMessage::TvmArming(current.tvm_armed))
        } else {
            None
        }
    }

    fn mark_sent(&mut self, message: UnitMessage) {
        match message {
            UnitMessage::EmergencyBrake(on) => self.sent.emergency_brake = on,
            UnitMessage::BreakerOrder(order) => self.sent.breaker = order,
            UnitMessage::PantographOrder(up) => self.sent.pantograph_up = up,
            UnitMessage::TvmArming(armed) => self.sent.tvm_armed = armed,
        }
    }
}
