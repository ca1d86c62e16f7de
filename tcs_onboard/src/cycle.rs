//! Cycle arbiter: one host sample in, one command set out.
//!
//! ## Tick Order
//! 1. Inbound inter-unit message (followers apply leader orders).
//! 2. Signal-passed detection and power zones.
//! 3. Breaker, VACMA, TVM, KVB, RSO, each owning its own latch.
//! 4. Emergency causes OR-ed into one brake command.
//! 5. Indicators, events, driver message, outbound message.
//!
//! The arbiter never clears a subsystem latch; it only reports them.

use static_assertions::const_assert_eq;
use tcs_common::host::{CabControls, HostInputs, SignalObservation, TcsCommands};
use tcs_common::tcs::error::{EmergencyCause, KvbEmergency};
use tcs_common::tcs::indicator::{DriverMessage, Indicator, TcsEvent};
use tcs_common::tcs::message::{BreakerOrder, UnitMessage};
use tcs_common::tcs::state::{
    BreakerState, KvbState, PowerSupplyKind, RsoState, TvmArming, TvmKind, UnitRole,
};

use crate::config::LoadedConfig;
use crate::link::{InterUnitLink, LeaderRelay, RelayedState};
use crate::power::breaker::{BreakerInputs, BreakerMachine, closing_authorization};
use crate::power::zones::PowerZones;
use crate::safety::kvb::{Kvb, KvbInputs, KvbUpdate};
use crate::safety::rso::{Rso, RsoInhibition, RsoInputs};
use crate::safety::tvm::table::TvmSpeed;
use crate::safety::tvm::{Tvm, TvmInputs, TvmUpdate};
use crate::safety::vacma::{Vacma, VacmaInputs, VacmaTransition};
use crate::signal::SignalTracker;

// ─── Cycle Statistics ───────────────────────────────────────────────

const CAUSES: [EmergencyCause; 5] = [
    EmergencyCause::RSO,
    EmergencyCause::KVB,
    EmergencyCause::TVM,
    EmergencyCause::VACMA,
    EmergencyCause::LEADER,
];

const_assert_eq!(CAUSES.len(), EmergencyCause::all().bits().count_ones() as usize);

/// Running counters over the life of one supervisor.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Sum of host-reported elapsed time [s].
    pub simulated_s: f64,
    /// Rising edges of the emergency brake command.
    pub emergency_applications: u64,
    /// Times each cause was raised, indexed like [`EmergencyCause`] bits.
    pub cause_counts: [u64; 5],
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            simulated_s: 0.0,
            emergency_applications: 0,
            cause_counts: [0; 5],
        }
    }

    /// Record one tick.
    #[inline]
    pub fn record(&mut self, elapsed_s: f64, raised: EmergencyCause, applied: bool) {
        self.ticks += 1;
        self.simulated_s += elapsed_s.max(0.0);
        if applied {
            self.emergency_applications += 1;
        }
        for (count, cause) in self.cause_counts.iter_mut().zip(CAUSES) {
            if raised.contains(cause) {
                *count += 1;
            }
        }
    }

    /// Times `cause` was raised. Combined flags sum their counts.
    pub fn cause_count(&self, cause: EmergencyCause) -> u64 {
        self.cause_counts
            .iter()
            .zip(CAUSES)
            .filter(|(_, c)| cause.contains(*c))
            .map(|(n, _)| n)
            .sum()
    }
}

// ─── Remote Orders ──────────────────────────────────────────────────

/// Leader orders applied by a follower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RemoteOrders {
    /// Closing order held until the breaker settles.
    close: bool,
    /// Opening order for this tick only.
    open: bool,
    pantograph_down: bool,
    emergency: bool,
    /// Arming order for this tick only.
    arming: Option<bool>,
}

impl RemoteOrders {
    fn receive(&mut self, message: UnitMessage) {
        tracing::debug!(?message, "inter-unit message received");
        match message {
            UnitMessage::BreakerOrder(BreakerOrder::Close) => self.close = true,
            UnitMessage::BreakerOrder(BreakerOrder::Open) => {
                self.close = false;
                self.open = true;
            }
            UnitMessage::PantographOrder(up) => self.pantograph_down = !up,
            UnitMessage::TvmArming(armed) => self.arming = Some(armed),
            UnitMessage::EmergencyBrake(on) => self.emergency = on,
        }
    }

    /// Drop one-tick orders; release the closing order once the breaker
    /// is no longer closing.
    fn settle(&mut self, breaker: BreakerState) {
        self.open = false;
        self.arming = None;
        if breaker != BreakerState::Closing {
            self.close = false;
        }
    }
}

// ─── Arbiter ────────────────────────────────────────────────────────

/// Supervisor of one on-board unit.
#[derive(Debug, Clone)]
pub struct OnboardTcs {
    role: UnitRole,
    power_supply: PowerSupplyKind,

    tracker: SignalTracker,
    zones: PowerZones,
    breaker: BreakerMachine,
    rso: Option<Rso>,
    kvb: Option<Kvb>,
    tvm: Option<Tvm>,
    vacma: Option<Vacma>,

    link: InterUnitLink,
    relay: LeaderRelay,
    remote: RemoteOrders,

    causes: EmergencyCause,
    previous_controls: CabControls,
    stats: CycleStats,
}

impl OnboardTcs {
    /// Build every fitted subsystem in its initial state.
    pub fn new(loaded: &LoadedConfig) -> Self {
        let cfg = &loaded.tcs;
        let general = &cfg.general;
        let tvm = match general.tvm {
            TvmKind::None => None,
            kind => Some(Tvm::new(kind, &cfg.tvm, loaded.tvm_table.clone())),
        };
        tracing::info!(
            unit = %cfg.shared.service_name,
            role = ?general.role,
            rso = general.rso,
            kvb = general.kvb,
            tvm = ?general.tvm,
            vacma = general.vacma,
            "on-board supervisor initialised"
        );
        Self {
            role: general.role,
            power_supply: general.power_supply,
            tracker: SignalTracker::new(),
            zones: PowerZones::new(),
            breaker: BreakerMachine::new(cfg.breaker.closing_delay_s),
            rso: general.rso.then(|| Rso::new(&cfg.rso)),
            kvb: general.kvb.then(|| Kvb::new(&cfg.kvb)),
            tvm,
            vacma: general.vacma.then(|| Vacma::new(&cfg.vacma)),
            link: InterUnitLink::new(),
            relay: LeaderRelay::new(),
            remote: RemoteOrders::default(),
            causes: EmergencyCause::empty(),
            previous_controls: CabControls::default(),
            stats: CycleStats::new(),
        }
    }

    #[inline]
    pub const fn role(&self) -> UnitRole {
        self.role
    }

    /// Causes demanding emergency braking after the last tick.
    #[inline]
    pub const fn causes(&self) -> EmergencyCause {
        self.causes
    }

    #[inline]
    pub const fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub const fn breaker(&self) -> &BreakerMachine {
        &self.breaker
    }

    pub fn rso(&self) -> Option<&Rso> {
        self.rso.as_ref()
    }

    pub fn kvb(&self) -> Option<&Kvb> {
        self.kvb.as_ref()
    }

    pub fn tvm(&self) -> Option<&Tvm> {
        self.tvm.as_ref()
    }

    pub fn vacma(&self) -> Option<&Vacma> {
        self.vacma.as_ref()
    }

    #[inline]
    pub const fn zones(&self) -> &PowerZones {
        &self.zones
    }

    /// Run one tick.
    pub fn update(&mut self, inputs: &HostInputs) -> TcsCommands {
        let mut cmd = TcsCommands::default();
        let dt = inputs.elapsed_s.max(0.0);
        let controls = &inputs.controls;

        if let Some(message) = inputs.inbound {
            match self.role {
                UnitRole::Follower => self.remote.receive(message),
                UnitRole::Leader => tracing::debug!(?message, "leader ignores inbound message"),
            }
        }

        let passed = self
            .tracker
            .update(inputs.signals.first(), inputs.speed_mps);
        let passed = passed.as_ref();
        self.zones.update(passed, inputs.distance_m);

        self.step_breaker(inputs, dt, &mut cmd);
        self.step_vacma(inputs, dt, &mut cmd);
        let tvm_update = self.step_tvm(inputs, passed, dt, &mut cmd);
        let kvb_update = self.step_kvb(inputs, passed, &mut cmd);
        self.step_rso(inputs, passed, dt, &mut cmd);

        // ── Emergency arbitration ──
        let previous = self.causes;
        self.causes = self.collect_causes();
        let raised = self.causes.raised_since(previous);
        self.driver_messages(raised, &kvb_update, &mut cmd);

        cmd.emergency_brake = !self.causes.is_empty();
        let was_braking = !previous.is_empty();
        if cmd.emergency_brake && !was_braking {
            tracing::warn!(causes = ?self.causes, "emergency brake applied");
            cmd.push_event(TcsEvent::EmergencyBrakeApplied);
        } else if !cmd.emergency_brake && was_braking {
            tracing::info!("emergency brake released");
            cmd.push_event(TcsEvent::EmergencyBrakeReleased);
        }
        if tvm_update.aspect_changed {
            cmd.push_event(TcsEvent::TvmAspectChanged);
        }

        // ── Power ──
        let cb_zone = self.zones.breaker_opening_required();
        cmd.power_authorization = self.causes.is_empty() && !cb_zone;
        cmd.pantograph_lowering_order =
            self.zones.pantograph_lowering_required() || self.remote.pantograph_down;

        // ── Displays ──
        let armed_tvm = self.tvm.as_ref().filter(|t| t.is_armed());
        (cmd.current_speed_limit_mps, cmd.next_speed_limit_mps) = match (armed_tvm, &self.kvb) {
            (Some(tvm), _) => (tvm.current_limit_mps(), tvm.next_limit_mps()),
            (None, Some(kvb)) => (kvb.current_limit_mps(), kvb.next_limit_mps()),
            (None, None) => (None, None),
        };
        self.set_indicators(&mut cmd);

        // ── Inter-unit link ──
        if self.role == UnitRole::Leader {
            let current = RelayedState {
                emergency_brake: cmd.emergency_brake,
                breaker: match self.breaker.state() {
                    BreakerState::Open => BreakerOrder::Open,
                    BreakerState::Closing | BreakerState::Closed => BreakerOrder::Close,
                },
                pantograph_up: !cmd.pantograph_lowering_order,
                tvm_armed: self.tvm.as_ref().is_some_and(Tvm::is_armed),
            };
            self.relay.relay(&current, &mut self.link);
        }
        cmd.outbound = self.link.take();

        self.remote.settle(self.breaker.state());
        self.previous_controls = *controls;
        self.stats
            .record(dt, raised, cmd.emergency_brake && !was_braking);
        cmd
    }

    fn step_breaker(&mut self, inputs: &HostInputs, dt: f64, cmd: &mut TcsCommands) {
        let power = &inputs.power;
        let cb_zone = self.zones.breaker_opening_required();
        let authorization = closing_authorization(
            self.power_supply,
            !cb_zone,
            power.driver_closing_authorization,
            power.pantograph_up,
            power.diesel_engine_running,
        );
        let tcs_opening_order = cb_zone || self.remote.open;
        let transition = self.breaker.update(
            &BreakerInputs {
                driver_closing_order: power.driver_closing_order,
                driver_opening_order: power.driver_opening_order,
                tcs_closing_order: self.remote.close,
                tcs_opening_order,
                closing_authorization: authorization,
                service_retention: power.service_retention,
            },
            dt,
        );
        cmd.breaker_state = self.breaker.state();
        cmd.breaker_closing_authorization = authorization;
        cmd.breaker_opening_order = tcs_opening_order;
        match transition {
            Some(BreakerState::Open) => cmd.push_event(TcsEvent::BreakerOpened),
            Some(BreakerState::Closing) => cmd.push_event(TcsEvent::BreakerClosing),
            Some(BreakerState::Closed) => cmd.push_event(TcsEvent::BreakerClosed),
            None => {}
        }
    }

    fn step_vacma(&mut self, inputs: &HostInputs, dt: f64, cmd: &mut TcsCommands) {
        let Some(vacma) = self.vacma.as_mut() else {
            return;
        };
        let c = &inputs.controls;
        let p = &self.previous_controls;
        let activity = c.horn
            || c.throttle_percent != p.throttle_percent
            || c.dynamic_brake_percent != p.dynamic_brake_percent;
        let transition = vacma.update(
            &VacmaInputs {
                speed_mps: inputs.speed_mps,
                pressed: c.vacma_pressed,
                activity,
                rearm: c.rearm,
            },
            dt,
        );
        match transition {
            Some(VacmaTransition::AlertStarted) => cmd.push_event(TcsEvent::VacmaAlertStart),
            Some(VacmaTransition::AlertStopped) => cmd.push_event(TcsEvent::VacmaAlertStop),
            None => {}
        }
    }

    fn step_tvm(
        &mut self,
        inputs: &HostInputs,
        passed: Option<&SignalObservation>,
        dt: f64,
        cmd: &mut TcsCommands,
    ) -> TvmUpdate {
        let Some(tvm) = self.tvm.as_mut() else {
            return TvmUpdate::default();
        };
        let c = &inputs.controls;
        let update = tvm.update(
            &TvmInputs {
                speed_mps: inputs.speed_mps,
                line_speed_mps: inputs.line_speed_limit_mps,
                signals: &inputs.signals,
                passed,
                arm_button: c.tvm_arm,
                disarm_button: c.tvm_disarm,
                covit_inhibited: c.tvm_covit_inhibited,
                remote_arming: self.remote.arming,
            },
            dt,
        );
        match update.arming {
            Some(TvmArming::Armed) => cmd.push_event(TcsEvent::TvmArmed),
            Some(TvmArming::Disarmed) => cmd.push_event(TcsEvent::TvmDisarmed),
            None => {}
        }
        update
    }

    fn step_kvb(
        &mut self,
        inputs: &HostInputs,
        passed: Option<&SignalObservation>,
        cmd: &mut TcsCommands,
    ) -> KvbUpdate {
        let tvm_armed = self.tvm.as_ref().is_some_and(Tvm::is_armed);
        let Some(kvb) = self.kvb.as_mut() else {
            return KvbUpdate::default();
        };
        let update = kvb.update(&KvbInputs {
            speed_mps: inputs.speed_mps,
            declivity: inputs.declivity,
            train_length_m: inputs.train_length_m,
            line_speed_mps: inputs.line_speed_limit_mps,
            distance_m: inputs.distance_m,
            signals: &inputs.signals,
            passed,
            next_speed_post: inputs.next_speed_post.as_ref(),
            end_of_authority_m: inputs.end_of_authority_m,
            tvm_armed,
            rearm: inputs.controls.rearm,
        });
        match update.state {
            Some(KvbState::Alert) => cmd.push_event(TcsEvent::KvbAlertChime),
            Some(KvbState::Emergency) => cmd.push_event(TcsEvent::KvbPenaltyChime),
            Some(KvbState::Normal) | None => {}
        }
        if update.mode.is_some() {
            cmd.push_event(TcsEvent::KvbModeChanged);
        }
        if update.rearmed {
            cmd.set_message(DriverMessage::KvbRearmed);
        }
        update
    }

    fn step_rso(
        &mut self,
        inputs: &HostInputs,
        passed: Option<&SignalObservation>,
        dt: f64,
        cmd: &mut TcsCommands,
    ) {
        let tvm_armed = self.tvm.as_ref().is_some_and(Tvm::is_armed);
        let high_speed = self.kvb.as_ref().is_some_and(Kvb::is_high_speed);
        let inhibition = RsoInhibition {
            direction_reversed: inputs.direction_reversed,
            kvb_tvm_joint: high_speed && tvm_armed,
            tvm_covit_active: self.tvm.as_ref().is_some_and(Tvm::covit_active),
        };
        let Some(rso) = self.rso.as_mut() else {
            return;
        };
        let previous = rso.state();
        let c = &inputs.controls;
        let transition = rso.update(
            &RsoInputs {
                passed,
                acknowledge: c.rso_acknowledge,
                cancel: c.rso_cancel,
                rearm: c.rearm,
                inhibition,
            },
            dt,
        );
        let Some(next) = transition else {
            return;
        };
        match next {
            RsoState::TriggeredPressed | RsoState::TriggeredBlinking if !previous.is_triggered() => {
                cmd.push_event(TcsEvent::RsoTriggered)
            }
            RsoState::TriggeredFixed => cmd.push_event(TcsEvent::RsoAcknowledged),
            RsoState::Off if previous.is_triggered() => cmd.push_event(TcsEvent::RsoCleared),
            _ => {}
        }
    }

    fn collect_causes(&self) -> EmergencyCause {
        let mut causes = EmergencyCause::empty();
        causes.set(
            EmergencyCause::RSO,
            self.rso.as_ref().is_some_and(Rso::emergency_braking),
        );
        causes.set(
            EmergencyCause::KVB,
            self.kvb.as_ref().is_some_and(Kvb::emergency_braking),
        );
        causes.set(
            EmergencyCause::TVM,
            self.tvm.as_ref().is_some_and(Tvm::emergency_braking),
        );
        causes.set(
            EmergencyCause::VACMA,
            self.vacma.as_ref().is_some_and(Vacma::emergency_braking),
        );
        causes.set(EmergencyCause::LEADER, self.remote.emergency);
        causes
    }

    fn driver_messages(&self, raised: EmergencyCause, kvb: &KvbUpdate, cmd: &mut TcsCommands) {
        if raised.contains(EmergencyCause::KVB) || !kvb.raised.is_empty() {
            let conditions = if kvb.raised.is_empty() {
                self.kvb.as_ref().map_or(KvbEmergency::empty(), Kvb::conditions)
            } else {
                kvb.raised
            };
            let message = if conditions.contains(KvbEmergency::SPAD) {
                Some(DriverMessage::KvbSignalPassedAtDanger)
            } else if conditions.contains(KvbEmergency::KARM) {
                Some(DriverMessage::KvbTvmNotArmed)
            } else if conditions.contains(KvbEmergency::OVERSPEED) {
                Some(DriverMessage::KvbOverspeed)
            } else {
                None
            };
            if let Some(m) = message {
                cmd.set_message(m);
            }
        }
        if raised.contains(EmergencyCause::TVM) {
            let spad = self.tvm.as_ref().is_some_and(Tvm::spad);
            cmd.set_message(if spad {
                DriverMessage::TvmSignalPassedAtDanger
            } else {
                DriverMessage::TvmOverspeed
            });
        }
        if raised.contains(EmergencyCause::RSO) {
            cmd.set_message(DriverMessage::RsoEmergency);
        }
        if raised.contains(EmergencyCause::VACMA) {
            cmd.set_message(DriverMessage::VacmaEmergency);
        }
    }

    fn set_indicators(&self, cmd: &mut TcsCommands) {
        cmd.set_indicator(Indicator::Breaker, self.breaker.state() as i32);
        cmd.set_indicator(Indicator::EmergencyBrake, i32::from(cmd.emergency_brake));
        if let Some(rso) = &self.rso {
            cmd.set_indicator(Indicator::RsoLamp, i32::from(rso.lamp_on()));
        }
        if let Some(kvb) = &self.kvb {
            cmd.set_indicator(Indicator::KvbAlert, i32::from(kvb.state() == KvbState::Alert));
            cmd.set_indicator(Indicator::KvbEmergency, i32::from(kvb.emergency_braking()));
            cmd.set_indicator(Indicator::KvbDisplay, kvb.display() as i32);
            cmd.set_indicator(Indicator::KvbPreAnnounce, kvb.preannounce() as i32);
        }
        if let Some(tvm) = &self.tvm {
            cmd.set_indicator(Indicator::TvmArmed, i32::from(tvm.is_armed()));
            let aspect = if tvm.is_armed() {
                aspect_code(tvm.entry().aspect)
            } else {
                0
            };
            cmd.set_indicator(Indicator::TvmAspect, aspect);
            cmd.set_indicator(Indicator::TvmAspectKind, tvm.aspect_kind() as i32);
            cmd.set_indicator(Indicator::TvmBlink, i32::from(tvm.blink_on()));
        }
        if let Some(vacma) = &self.vacma {
            cmd.set_indicator(Indicator::VacmaAlert, i32::from(vacma.alert()));
        }
    }
}

/// Cab code of a TVM aspect: km/h, `-1` for RRR.
fn aspect_code(speed: TvmSpeed) -> i32 {
    match speed {
        TvmSpeed::Rrr => -1,
        s => s.kph() as i32,
    }
}
