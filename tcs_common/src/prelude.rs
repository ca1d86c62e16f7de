//! Prelude module for common re-exports.
//!
//! ```rust
//! use tcs_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::tcs::config::TcsConfig;

// ─── Units ──────────────────────────────────────────────────────────
pub use crate::consts::{kph_to_mps, mps_to_kph, STANDSTILL_SPEED_MPS};

// ─── Host Interface ─────────────────────────────────────────────────
pub use crate::host::{
    CabControls, HostInputs, PowerInputs, SignalAspect, SignalObservation, SpeedPostObservation,
    TcsCommands,
};

// ─── Supervisor Vocabulary ──────────────────────────────────────────
pub use crate::tcs::error::EmergencyCause;
pub use crate::tcs::indicator::{DriverMessage, Indicator, TcsEvent};
pub use crate::tcs::message::UnitMessage;
