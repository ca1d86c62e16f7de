//! KVB beacon speed control.
//!
//! On a conventional line the KVB reads the field of every passed signal,
//! keeps a stop target and restriction targets ahead, and supervises the
//! current speed against the train ceiling, the signal execution speed and
//! braking curves towards each target. On a high-speed line supervision is
//! left to the TVM and the KVB only checks that the TVM is armed. That
//! check is suspended while the exit distance runs and for the same
//! distance after a `TVM_DISARM` beacon, since the TVM disarms at the end of
//! the line before the KVB hands back to conventional mode.
//!
//! Two layers of state:
//! - [`KvbState`] drives the cab sounds. Normal → Alert → Emergency, back
//!   to Normal only at standstill.
//! - the emergency output latch, set by any [`KvbEmergency`] condition and
//!   released only when every condition is gone and the driver rearms.
//!   Rearming enters on-sight running (30 km/h) until the next field.

pub mod field;
pub mod mode;
pub mod preannounce;
pub mod target;

use tcs_common::consts::{
    HSL_EXIT_DISTANCE_M, KVB_ALERT_ANTICIPATION_S, KVB_ALERT_MARGIN_KPH, KVB_EMERGENCY_MARGIN_KPH, KVB_ON_SIGHT_KPH,
    KVB_PREANNOUNCE_THRESHOLD_KPH, KVB_V10_ALERT_MARGIN_KPH, KVB_V10_EMERGENCY_MARGIN_KPH,
    MAX_SIGNALS_AHEAD, STANDSTILL_SPEED_MPS, kph_to_mps,
};
use tcs_common::host::{SignalObservation, SpeedPostObservation};
use tcs_common::tcs::config::KvbConfig;
use tcs_common::tcs::error::KvbEmergency;
use tcs_common::tcs::indicator::KvbDisplay;
use tcs_common::tcs::state::{KvbMode, KvbState, PreAnnounce};

use self::field::{ExecutionSpeed, ReleaseSpeed, TargetSpeed};
use self::mode::ModeSelector;
use self::preannounce::{PreAnnounceInputs, PreAnnounceToken};
use self::target::{StopTarget, Target};
use crate::curve::{Margins, Supervision, speed_curve};
use crate::primitives::OdoMeter;
use crate::safety::tvm::arming::DISARM_TAG;

/// Margins of flat ceilings and restriction curves.
pub const NORMAL_MARGINS: Margins = Margins::from_kph(KVB_ALERT_MARGIN_KPH, KVB_EMERGENCY_MARGIN_KPH);
/// Margins of stop targets with a V10 release speed.
pub const V10_MARGINS: Margins =
    Margins::from_kph(KVB_V10_ALERT_MARGIN_KPH, KVB_V10_EMERGENCY_MARGIN_KPH);

// ─── Braking parameters ─────────────────────────────────────────────

/// Brake equipment class, selecting the brake-establishment delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrakeKind {
    ElectroPneumatic,
    HeavyFreight,
    #[default]
    Standard,
}

impl BrakeKind {
    pub const fn from_config(config: &KvbConfig) -> Self {
        if config.electropneumatic_brake {
            Self::ElectroPneumatic
        } else if config.heavy_freight {
            Self::HeavyFreight
        } else {
            Self::Standard
        }
    }
}

/// Brake-establishment delay [s] for a train of `length_m`.
pub fn brake_delay_s(brake: BrakeKind, length_m: f64) -> f64 {
    let l = if length_m.is_finite() { length_m.max(0.0) } else { 0.0 };
    match brake {
        BrakeKind::ElectroPneumatic => 2.0 + 0.5 * l * l * 1e-5,
        BrakeKind::HeavyFreight => 12.0 + l / 200.0,
        BrakeKind::Standard => 2.0 + 2.0 * l * l * 1e-5,
    }
}

/// Alert and emergency limits of a braking curve towards `target` [m/s].
///
/// The alert curve anticipates by [`KVB_ALERT_ANTICIPATION_S`]; both are
/// floored at `release_mps`.
pub fn target_limits(
    target: &Target,
    release_mps: f64,
    declivity: f64,
    delay_s: f64,
    deceleration_mps2: f64,
) -> (f64, f64) {
    let curve = |delay: f64| {
        speed_curve(target.distance_m, target.speed_mps, declivity, delay, deceleration_mps2)
            .max(release_mps)
    };
    (curve(delay_s + KVB_ALERT_ANTICIPATION_S), curve(delay_s))
}

// ─── Tick interface ─────────────────────────────────────────────────

/// Inputs for one KVB tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct KvbInputs<'a> {
    pub speed_mps: f64,
    pub declivity: f64,
    pub train_length_m: f64,
    pub line_speed_mps: f64,
    /// Distance travelled since the previous tick [m].
    pub distance_m: f64,
    pub signals: &'a [SignalObservation],
    pub passed: Option<&'a SignalObservation>,
    pub next_speed_post: Option<&'a SpeedPostObservation>,
    pub end_of_authority_m: Option<f64>,
    pub tvm_armed: bool,
    pub rearm: bool,
}

/// What changed during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KvbUpdate {
    pub state: Option<KvbState>,
    pub mode: Option<KvbMode>,
    /// Conditions raised this tick.
    pub raised: KvbEmergency,
    /// Output latch released by the driver this tick.
    pub rearmed: bool,
}

// ─── Subsystem ──────────────────────────────────────────────────────

/// KVB subsystem state.
#[derive(Debug, Clone)]
pub struct Kvb {
    train_limit_mps: f64,
    deceleration_mps2: f64,
    brake: BrakeKind,
    configured_length_m: Option<f64>,

    state: KvbState,
    mode: ModeSelector,
    /// Distance since the last `TVM_DISARM` beacon.
    disarm_window: OdoMeter,
    preannounce: PreAnnounceToken,
    execution_limit_mps: Option<f64>,
    stop_target: Option<StopTarget>,
    on_sight: bool,

    conditions: KvbEmergency,
    latched: bool,
    supervision: Supervision,
    delay_s: f64,
    next_target: Option<Target>,
}

impl Kvb {
    pub fn new(config: &KvbConfig) -> Self {
        let brake = BrakeKind::from_config(config);
        Self {
            train_limit_mps: kph_to_mps(config.train_speed_limit_kph),
            deceleration_mps2: config.safe_deceleration_mps2,
            brake,
            configured_length_m: config.train_length_m,
            state: KvbState::Normal,
            mode: ModeSelector::new(),
            disarm_window: OdoMeter::new(HSL_EXIT_DISTANCE_M),
            preannounce: PreAnnounceToken::new(),
            execution_limit_mps: None,
            stop_target: None,
            on_sight: false,
            conditions: KvbEmergency::empty(),
            latched: false,
            supervision: Supervision::default(),
            delay_s: brake_delay_s(brake, config.train_length_m.unwrap_or(0.0)),
            next_target: None,
        }
    }

    #[inline]
    pub const fn state(&self) -> KvbState {
        self.state
    }

    #[inline]
    pub const fn mode(&self) -> KvbMode {
        self.mode.mode()
    }

    #[inline]
    pub const fn is_high_speed(&self) -> bool {
        self.mode.is_high_speed()
    }

    #[inline]
    pub const fn preannounce(&self) -> PreAnnounce {
        self.preannounce.state()
    }

    #[inline]
    pub const fn emergency_braking(&self) -> bool {
        self.latched
    }

    #[inline]
    pub const fn conditions(&self) -> KvbEmergency {
        self.conditions
    }

    #[inline]
    pub const fn on_sight(&self) -> bool {
        self.on_sight
    }

    #[inline]
    pub const fn supervision(&self) -> Supervision {
        self.supervision
    }

    /// Brake-establishment delay used on the last tick [s].
    #[inline]
    pub const fn brake_delay_s(&self) -> f64 {
        self.delay_s
    }

    pub fn stop_target_m(&self) -> Option<f64> {
        self.stop_target.as_ref().map(StopTarget::remaining_m)
    }

    /// Ceiling of the section: train limit, pre-announce, execution speed
    /// and on-sight running.
    pub fn current_limit_mps(&self) -> Option<f64> {
        if self.is_high_speed() {
            return None;
        }
        let mut limit = self.preannounce.ceiling_mps(self.train_limit_mps);
        if let Some(exec) = self.execution_limit_mps {
            limit = limit.min(exec);
        }
        if self.on_sight {
            limit = limit.min(kph_to_mps(KVB_ON_SIGHT_KPH));
        }
        Some(limit)
    }

    /// Speed of the nearest target ahead.
    pub fn next_limit_mps(&self) -> Option<f64> {
        self.next_target.map(|t| t.speed_mps)
    }

    pub fn display(&self) -> KvbDisplay {
        if self.latched {
            KvbDisplay::Emergency
        } else if self.is_high_speed() {
            KvbDisplay::Blank
        } else if self.on_sight {
            KvbDisplay::OnSight
        } else if self.stop_target.is_some() {
            KvbDisplay::StopTarget
        } else if self.next_target.is_some()
            || self
                .execution_limit_mps
                .is_some_and(|l| l < self.train_limit_mps)
        {
            KvbDisplay::Restriction
        } else {
            KvbDisplay::Blank
        }
    }

    /// Advance one tick.
    pub fn update(&mut self, inputs: &KvbInputs<'_>) -> KvbUpdate {
        let mut update = KvbUpdate::default();
        let speed = inputs.speed_mps.abs();

        update.mode = self.mode.update(inputs.line_speed_mps, inputs.distance_m);
        self.disarm_window.update(inputs.distance_m);
        if inputs.passed.is_some_and(|s| s.has_tag(DISARM_TAG)) {
            self.disarm_window.stop();
            self.disarm_window.start();
        }
        if self.disarm_window.triggered() || !self.is_high_speed() {
            self.disarm_window.stop();
        }
        let length = self.configured_length_m.unwrap_or(inputs.train_length_m);
        self.delay_s = brake_delay_s(self.brake, length);

        if let Some(stop) = self.stop_target.as_mut() {
            stop.update(inputs.distance_m);
        }

        let previous = self.conditions;
        let high_speed = self.is_high_speed();

        let read = inputs.passed.and_then(|s| field::decode(s).map(|f| (s, f)));
        let mut preannounce = PreAnnounceInputs {
            line_speed_mps: inputs.line_speed_mps,
            restriction_m: self.preannounce_restriction(inputs.signals),
            ..Default::default()
        };
        if let Some((signal, field)) = read {
            tracing::debug!(?field, "KVB field read");
            if field.spad && !high_speed {
                tracing::warn!("KVB signal passed at danger");
                self.conditions |= KvbEmergency::SPAD;
            }
            self.execution_limit_mps = field
                .execution
                .limit_mps(self.train_limit_mps, field.signal_limit_mps);
            self.on_sight = false;
            self.stop_target = match field.target {
                TargetSpeed::V0 => StopTarget::acquire(inputs.signals, inputs.end_of_authority_m),
                _ => None,
            };

            let threshold = kph_to_mps(KVB_PREANNOUNCE_THRESHOLD_KPH);
            preannounce.onset_passed = field.target == TargetSpeed::V160;
            preannounce.restriction_passed = field.execution == ExecutionSpeed::C
                || signal.speed_limit_mps.is_some_and(|l| l <= threshold);
            preannounce.clear_field = field.is_clear();
        }
        preannounce.signal_speed_mps = self.execution_limit_mps.unwrap_or(self.train_limit_mps);
        self.preannounce.update(&preannounce);

        self.supervision = if high_speed {
            self.next_target = None;
            Supervision::default()
        } else {
            self.supervise(inputs, speed)
        };

        if self.supervision.emergency && !self.conditions.contains(KvbEmergency::OVERSPEED) {
            tracing::warn!(speed_mps = speed, "KVB overspeed");
            self.conditions |= KvbEmergency::OVERSPEED;
        }
        if speed < STANDSTILL_SPEED_MPS {
            self.conditions -= KvbEmergency::SPAD | KvbEmergency::OVERSPEED;
        }
        let handing_over = self.mode.leaving() || self.disarm_window.started();
        self.conditions.set(
            KvbEmergency::KARM,
            high_speed && !inputs.tvm_armed && !handing_over,
        );
        update.raised = self.conditions.difference(previous);

        update.state = self.step_state(speed);

        if !self.conditions.is_empty() {
            self.latched = true;
        } else if self.latched && inputs.rearm {
            tracing::info!("KVB emergency rearmed, on-sight running");
            self.latched = false;
            self.on_sight = true;
            update.rearmed = true;
        }
        update
    }

    /// Distance to the next restriction to 160 km/h or below.
    fn preannounce_restriction(&self, signals: &[SignalObservation]) -> Option<f64> {
        let threshold = kph_to_mps(KVB_PREANNOUNCE_THRESHOLD_KPH);
        signals
            .iter()
            .take(MAX_SIGNALS_AHEAD)
            .find(|s| s.speed_limit_mps.is_some_and(|l| l <= threshold))
            .map(|s| s.distance_m)
    }

    fn supervise(&mut self, inputs: &KvbInputs<'_>, speed: f64) -> Supervision {
        let mut sup = Supervision::default();
        let (decl, delay, decel) = (inputs.declivity, self.delay_s, self.deceleration_mps2);

        if let Some(limit) = self.current_limit_mps() {
            sup = sup.merge(Supervision::flat(speed, limit, NORMAL_MARGINS));
        }

        let mut nearest: Option<Target> = None;
        let mut consider = |t: Target| {
            if nearest.is_none_or(|n| t.distance_m < n.distance_m) {
                nearest = Some(t);
            }
        };

        if let Some(stop) = self.stop_target.as_ref() {
            let release = stop.release();
            let margins = match release {
                ReleaseSpeed::V10 => V10_MARGINS,
                ReleaseSpeed::V30 => NORMAL_MARGINS,
            };
            let t = stop.target();
            let (alert, emergency) = target_limits(&t, release.mps(), decl, delay, decel);
            sup = sup.merge(Supervision::check(speed, alert, emergency, margins));
            consider(t);
        }

        let restrictions = [
            target::restriction(inputs.signals, self.train_limit_mps),
            target::line_speed_change(inputs.next_speed_post, inputs.line_speed_mps),
            self.preannounce.target(),
        ];
        for t in restrictions.into_iter().flatten() {
            let (alert, emergency) = target_limits(&t, t.speed_mps, decl, delay, decel);
            sup = sup.merge(Supervision::check(speed, alert, emergency, NORMAL_MARGINS));
            consider(t);
        }

        self.next_target = nearest;
        sup
    }

    fn step_state(&mut self, speed: f64) -> Option<KvbState> {
        let emergency = !self.conditions.is_empty();
        let next = match self.state {
            KvbState::Normal | KvbState::Alert if emergency => KvbState::Emergency,
            KvbState::Normal if self.supervision.alert => KvbState::Alert,
            KvbState::Alert if !self.supervision.alert => KvbState::Normal,
            KvbState::Emergency if speed < STANDSTILL_SPEED_MPS && !emergency => KvbState::Normal,
            current => current,
        };
        if next == self.state {
            return None;
        }
        tracing::info!(from = ?self.state, to = ?next, "KVB state");
        self.state = next;
        Some(next)
    }
}
