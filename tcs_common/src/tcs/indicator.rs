//! Cab indicators, sound triggers and driver message keys.
//!
//! Rendering, audio and localisation belong to the host; the supervisor only
//! emits numeric indicator states, edge-triggered event names and message
//! keys.

use serde::{Deserialize, Serialize};

/// Cab display control, identified by a stable numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Indicator {
    /// Breaker lamp: 0 open, 1 closing, 2 closed.
    Breaker = 1,
    /// RSO closed-signal lamp: 0 off, 1 on.
    RsoLamp = 10,
    /// KVB alert lamp: 0 off, 1 on.
    KvbAlert = 20,
    /// KVB emergency lamp ("FU"): 0 off, 1 on.
    KvbEmergency = 21,
    /// KVB main display, see [`KvbDisplay`].
    KvbDisplay = 22,
    /// KVB pre-announce lamp: token state as `u8`.
    KvbPreAnnounce = 23,
    /// TVM armed lamp: 0 disarmed, 1 armed.
    TvmArmed = 30,
    /// TVM aspect code (displayed speed in km/h, -1 for RRR, 0 for 000).
    TvmAspect = 31,
    /// TVM aspect kind: 0 none, 1 green, 2 announce, 3 stop.
    TvmAspectKind = 32,
    /// TVM aspect blink phase: 0 steady/off phase, 1 on phase.
    TvmBlink = 33,
    /// VACMA alert lamp: 0 off, 1 on.
    VacmaAlert = 40,
    /// Emergency braking lamp: 0 released, 1 applied.
    EmergencyBrake = 50,
}

/// One indicator update sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorUpdate {
    pub indicator: Indicator,
    pub state: i32,
}

/// KVB main display codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum KvbDisplay {
    /// Nothing displayed.
    Blank = 0,
    /// "00": stop target supervised.
    StopTarget = 1,
    /// "000": on-sight after rearm.
    OnSight = 2,
    /// "b": speed restriction supervised.
    Restriction = 3,
    /// "FU": emergency braking.
    Emergency = 4,
}

/// Edge-triggered sound/event triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TcsEvent {
    BreakerOpened,
    BreakerClosing,
    BreakerClosed,
    RsoTriggered,
    RsoAcknowledged,
    RsoCleared,
    KvbAlertChime,
    KvbPenaltyChime,
    KvbModeChanged,
    TvmArmed,
    TvmDisarmed,
    TvmAspectChanged,
    VacmaAlertStart,
    VacmaAlertStop,
    EmergencyBrakeApplied,
    EmergencyBrakeReleased,
}

/// Localised driver message keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverMessage {
    RsoEmergency,
    KvbOverspeed,
    KvbSignalPassedAtDanger,
    KvbTvmNotArmed,
    KvbRearmed,
    TvmOverspeed,
    TvmSignalPassedAtDanger,
    VacmaEmergency,
}
