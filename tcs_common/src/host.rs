//! Host interface snapshots.
//!
//! The simulator is sampled once per tick into a [`HostInputs`] value and
//! receives exactly one [`TcsCommands`] value back. Nothing in the
//! supervisor queries the host between those two points.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAX_EVENTS_PER_TICK, MAX_INDICATORS, MAX_SIGNALS_AHEAD, MAX_SIGNAL_TAGS, SIGNAL_TAG_LEN};
use crate::tcs::indicator::{DriverMessage, Indicator, IndicatorUpdate, TcsEvent};
use crate::tcs::message::UnitMessage;
use crate::tcs::state::BreakerState;

/// One punctual-information tag attached to a signal.
pub type SignalTag = String<SIGNAL_TAG_LEN>;

/// Tag that does not fit a [`SignalObservation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("tag {tag:?} longer than {} bytes", SIGNAL_TAG_LEN)]
    TooLong { tag: std::string::String },

    #[error("more than {} tags on one signal", MAX_SIGNAL_TAGS)]
    TooMany,
}

// ─── Track Observations ─────────────────────────────────────────────

/// Aspect displayed by a lineside signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalAspect {
    /// Absolute stop ("carré").
    Stop,
    /// Permissive stop ("sémaphore" may be passed on sight).
    StopAndProceed,
    /// On-sight running.
    Restricting,
    /// Next signal at stop ("avertissement").
    Approach1,
    /// Speed reduction announced at the next signal.
    Approach2,
    /// Speed reduction to be executed at this signal.
    Approach3,
    Clear1,
    Clear2,
    /// Shunting permission.
    Permission,
    /// Aspect not reported by the host.
    #[default]
    Unknown,
}

impl SignalAspect {
    /// Caution or danger aspects that trigger signal repetition.
    #[inline]
    pub const fn is_closed(self) -> bool {
        matches!(
            self,
            Self::Stop
                | Self::StopAndProceed
                | Self::Restricting
                | Self::Approach1
                | Self::Approach2
                | Self::Approach3
        )
    }

    /// Aspects that clear signal repetition.
    #[inline]
    pub const fn is_opened(self) -> bool {
        matches!(self, Self::Clear1 | Self::Clear2)
    }

    /// Aspects a KVB stop target can be placed on.
    #[inline]
    pub const fn is_stop(self) -> bool {
        matches!(self, Self::Stop | Self::StopAndProceed)
    }
}

/// Sampled state of one signal ahead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SignalObservation {
    /// Distance from the train front [m].
    pub distance_m: f64,
    pub aspect: SignalAspect,
    /// Speed limit carried by the signal [m/s], `None` when unrestricted.
    pub speed_limit_mps: Option<f64>,
    /// Punctual information tags.
    pub tags: Vec<SignalTag, MAX_SIGNAL_TAGS>,
}

impl SignalObservation {
    pub fn new(distance_m: f64, aspect: SignalAspect) -> Self {
        Self {
            distance_m,
            aspect,
            speed_limit_mps: None,
            tags: Vec::new(),
        }
    }

    pub fn with_speed_limit(mut self, limit_mps: f64) -> Self {
        self.speed_limit_mps = Some(limit_mps);
        self
    }

    /// Attach a tag.
    pub fn add_tag(&mut self, tag: &str) -> Result<(), TagError> {
        let t = SignalTag::try_from(tag).map_err(|_| TagError::TooLong {
            tag: tag.into(),
        })?;
        self.tags.push(t).map_err(|_| TagError::TooMany)
    }

    /// Builder form of [`add_tag`](Self::add_tag). A tag that does not fit is
    /// logged and left out.
    pub fn with_tag(mut self, tag: &str) -> Self {
        if let Err(e) = self.add_tag(tag) {
            tracing::warn!(error = %e, distance_m = self.distance_m, "signal tag dropped");
        }
        self
    }

    /// Whether the signal carries exactly this tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.as_str() == tag)
    }

    /// Remainder of the first tag starting with `prefix`.
    pub fn tag_value(&self, prefix: &str) -> Option<&str> {
        self.tags
            .iter()
            .find_map(|t| t.as_str().strip_prefix(prefix))
    }
}

/// Train category a speed post applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeedPostCategory {
    /// Applies to every train.
    #[default]
    Standard,
    Passenger,
    Freight,
}

/// Sampled state of the next fixed speed-limit marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedPostObservation {
    pub distance_m: f64,
    pub limit_mps: f64,
    /// Warning board announcing the limit rather than the limit itself.
    pub warning: bool,
    pub category: SpeedPostCategory,
}

// ─── Cab & Vehicle Inputs ───────────────────────────────────────────

/// Driver controls relevant to train protection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CabControls {
    /// Dead-man control held.
    pub vacma_pressed: bool,
    /// Signal-repetition acknowledge button held.
    pub rso_acknowledge: bool,
    /// Signal-repetition cancel button.
    pub rso_cancel: bool,
    /// Emergency-brake rearm action.
    pub rearm: bool,
    pub tvm_arm: bool,
    pub tvm_disarm: bool,
    /// Overspeed supervision of the TVM switched off (maintenance key).
    pub tvm_covit_inhibited: bool,
    pub throttle_percent: f64,
    pub dynamic_brake_percent: f64,
    pub horn: bool,
}

/// State of the vehicle power subsystem and driver breaker orders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerInputs {
    pub pantograph_up: bool,
    pub diesel_engine_running: bool,
    pub driver_closing_order: bool,
    pub driver_opening_order: bool,
    pub driver_closing_authorization: bool,
    /// Keeps the breaker closed on loss of authorisation.
    pub service_retention: bool,
}

impl Default for PowerInputs {
    fn default() -> Self {
        Self {
            pantograph_up: true,
            diesel_engine_running: false,
            driver_closing_order: false,
            driver_opening_order: false,
            driver_closing_authorization: true,
            service_retention: false,
        }
    }
}

/// Everything the supervisor reads from the host during one tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostInputs {
    /// Time elapsed since the previous tick [s].
    pub elapsed_s: f64,
    /// Distance travelled since the previous tick [m].
    pub distance_m: f64,
    /// Current speed [m/s].
    pub speed_mps: f64,
    /// Track declivity, positive downhill (e.g. 0.005 for 5 ‰).
    pub declivity: f64,
    /// Train length [m].
    pub train_length_m: f64,
    /// Line speed limit at the train front [m/s].
    pub line_speed_limit_mps: f64,
    /// Signals ahead, nearest first.
    pub signals: Vec<SignalObservation, MAX_SIGNALS_AHEAD>,
    pub next_speed_post: Option<SpeedPostObservation>,
    /// Distance to the end of the movement authority [m].
    pub end_of_authority_m: Option<f64>,
    /// Train running with the cab reversed.
    pub direction_reversed: bool,
    pub controls: CabControls,
    pub power: PowerInputs,
    /// Message received from another unit of the consist.
    pub inbound: Option<UnitMessage>,
}

// ─── Commands ───────────────────────────────────────────────────────

/// Everything the supervisor writes to the host after one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TcsCommands {
    pub emergency_brake: bool,
    pub power_authorization: bool,
    pub breaker_state: BreakerState,
    pub breaker_closing_authorization: bool,
    pub breaker_opening_order: bool,
    pub pantograph_lowering_order: bool,
    pub current_speed_limit_mps: Option<f64>,
    pub next_speed_limit_mps: Option<f64>,
    pub indicators: Vec<IndicatorUpdate, MAX_INDICATORS>,
    pub events: Vec<TcsEvent, MAX_EVENTS_PER_TICK>,
    pub message: Option<DriverMessage>,
    pub outbound: Option<UnitMessage>,
}

impl TcsCommands {
    /// Set an indicator; a second write in the same tick replaces the first.
    pub fn set_indicator(&mut self, indicator: Indicator, state: i32) {
        if let Some(u) = self.indicators.iter_mut().find(|u| u.indicator == indicator) {
            u.state = state;
            return;
        }
        if self.indicators.push(IndicatorUpdate { indicator, state }).is_err() {
            tracing::warn!(?indicator, "indicator buffer full, update dropped");
        }
    }

    /// State written for `indicator` this tick.
    pub fn indicator(&self, indicator: Indicator) -> Option<i32> {
        self.indicators
            .iter()
            .find(|u| u.indicator == indicator)
            .map(|u| u.state)
    }

    pub fn push_event(&mut self, event: TcsEvent) {
        if self.events.push(event).is_err() {
            tracing::warn!(?event, "event buffer full, trigger dropped");
        }
    }

    pub fn has_event(&self, event: TcsEvent) -> bool {
        self.events.contains(&event)
    }

    /// Set the driver message unless one was already set this tick.
    pub fn set_message(&mut self, message: DriverMessage) {
        if self.message.is_none() {
            self.message = Some(message);
        }
    }
}
