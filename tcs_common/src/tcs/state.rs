//! State machine enums for the on-board subsystems.
//!
//! All enums use `#[repr(u8)]` so they can be reported to the host as
//! integer display codes without a lookup.

use serde::{Deserialize, Serialize};

// ─── Power ──────────────────────────────────────────────────────────

/// Circuit-breaker (or diesel traction relay) state.
///
/// Transitions are strictly cyclic: Open → Closing → Closed → Open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum BreakerState {
    #[default]
    Open = 0,
    Closing = 1,
    Closed = 2,
}

impl BreakerState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Open),
            1 => Some(Self::Closing),
            2 => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Kind of power supply the breaker authorisation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PowerSupplyKind {
    /// Pantograph-fed electric locomotive or EMU.
    #[default]
    Electric,
    /// Diesel-electric unit, traction relay gated by the engine.
    Diesel,
    /// Bi-mode unit: either source authorises closing.
    DualMode,
}

/// Role of this unit in a multiple-unit consist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitRole {
    /// Driven cab: produces orders for the followers.
    #[default]
    Leader,
    /// Remote unit: applies orders received from the leader.
    Follower,
}

// ─── RSO ────────────────────────────────────────────────────────────

/// Optical signal-repetition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum RsoState {
    /// First tick after initialisation; no trigger evaluated yet.
    #[default]
    Init = 0,
    /// No closed signal pending.
    Off = 1,
    /// Closed signal met while the acknowledge button was already held.
    TriggeredPressed = 2,
    /// Waiting for acknowledgement, lamp blinking.
    TriggeredBlinking = 3,
    /// Acknowledged, lamp fixed until the next opened signal.
    TriggeredFixed = 4,
}

impl RsoState {
    /// Whether a closed signal is pending (any triggered variant).
    #[inline]
    pub const fn is_triggered(self) -> bool {
        matches!(
            self,
            Self::TriggeredPressed | Self::TriggeredBlinking | Self::TriggeredFixed
        )
    }
}

// ─── KVB ────────────────────────────────────────────────────────────

/// KVB supervision state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum KvbState {
    #[default]
    Normal = 0,
    Alert = 1,
    Emergency = 2,
}

/// Line type the KVB is currently supervising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum KvbMode {
    /// Conventional line: beacon speed control active.
    #[default]
    ConventionalLine = 0,
    /// High-speed line: supervision delegated to TVM, arming consistency checked.
    HighSpeedLine = 1,
}

/// Pre-announce token for running above 160 km/h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum PreAnnounce {
    /// No pre-announce: ceiling 160 km/h.
    #[default]
    Deactivated = 0,
    /// Pre-announce received: ceiling 220 km/h.
    Armed = 1,
    /// Restriction to 160 km/h ahead: braking curve towards it.
    Triggered = 2,
    /// Restriction reached: ceiling 160 km/h.
    Execution160 = 3,
}

// ─── TVM ────────────────────────────────────────────────────────────

/// Continuous speed-control variant fitted on the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TvmKind {
    /// No cab signalling equipment.
    #[default]
    None,
    /// Flat per-block ceilings.
    Tvm300,
    /// Per-block ceilings with deceleration curves.
    Tvm430,
}

/// TVM arming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum TvmArming {
    #[default]
    Disarmed = 0,
    Armed = 1,
}

// ─── VACMA ──────────────────────────────────────────────────────────

/// Which vigilance timer pair is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum VacmaPair {
    /// Below activation speed: neither pair runs.
    #[default]
    Idle = 0,
    /// Dead-man control held.
    Pressed = 1,
    /// Dead-man control released.
    Released = 2,
}
