//! Inter-unit messages for multiple-unit consists.
//!
//! A leading unit relays driver orders to the remote units of the same
//! consist. At most one message travels per tick; there is no queue, a
//! message not collected by the next tick is simply superseded.

use serde::{Deserialize, Serialize};

/// Order relayed to the circuit breakers of remote units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakerOrder {
    Close,
    Open,
}

/// One message exchanged between units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UnitMessage {
    /// Breaker closing/opening order.
    BreakerOrder(BreakerOrder),
    /// Pantograph raise (`true`) or lower (`false`) order.
    PantographOrder(bool),
    /// TVM arming state of the leader.
    TvmArming(bool),
    /// Emergency braking demanded by the leader.
    EmergencyBrake(bool),
}
