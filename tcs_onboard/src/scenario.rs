//! Scripted replay host.
//!
//! A scenario file places signals and speed posts along a straight track,
//! scripts the driver (desired speed over time, timed control changes) and
//! runs the supervisor against a minimal kinematic stub: the train follows
//! the desired speed at a service rate and brakes at a fixed rate while
//! emergency braking is commanded.
//!
//! ```toml
//! [train]
//! initial_speed_kph = 90.0
//! length_m = 400.0
//!
//! [run]
//! tick_s = 0.1
//! duration_s = 40.0
//!
//! [[signal]]
//! position_m = 400.0
//! aspect = "stop"
//!
//! [[action]]
//! at_s = 0.0
//! control = "vacma_pressed"
//! value = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tcs_common::consts::{MAX_SIGNALS_AHEAD, kph_to_mps, mps_to_kph};
use tcs_common::host::{
    CabControls, HostInputs, PowerInputs, SignalAspect, SignalObservation, SpeedPostCategory,
    SpeedPostObservation, TcsCommands,
};
use tcs_common::tcs::message::UnitMessage;

use crate::config::LoadedConfig;
use crate::cycle::{CycleStats, OnboardTcs};

/// Scenario loading failure.
#[derive(Debug, Clone, Error)]
pub enum ScenarioError {
    #[error("scenario file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read scenario: {0}")]
    Io(String),

    #[error("failed to parse scenario: {0}")]
    ParseError(String),

    #[error("invalid scenario: {0}")]
    ValidationError(String),
}

// ─── File Layout ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub train: TrainSection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default, rename = "signal")]
    pub signals: Vec<ScenarioSignal>,
    #[serde(default, rename = "speed_post")]
    pub speed_posts: Vec<ScenarioSpeedPost>,
    #[serde(default, rename = "line_speed")]
    pub line_speeds: Vec<LineSpeedSection>,
    #[serde(default)]
    pub profile: Vec<ProfilePoint>,
    #[serde(default, rename = "action")]
    pub actions: Vec<Action>,
    #[serde(default, rename = "inbound")]
    pub inbound: Vec<InboundMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainSection {
    #[serde(default)]
    pub initial_speed_kph: f64,
    #[serde(default = "default_length")]
    pub length_m: f64,
    /// Line speed where no `[[line_speed]]` section applies [km/h].
    #[serde(default = "default_line_speed")]
    pub line_speed_kph: f64,
    #[serde(default)]
    pub declivity: f64,
    /// Rate used to follow the desired speed [m/s²].
    #[serde(default = "default_service_rate")]
    pub service_rate_mps2: f64,
    /// Deceleration while emergency braking is commanded [m/s²].
    #[serde(default = "default_emergency_rate")]
    pub emergency_deceleration_mps2: f64,
}

impl Default for TrainSection {
    fn default() -> Self {
        Self {
            initial_speed_kph: 0.0,
            length_m: default_length(),
            line_speed_kph: default_line_speed(),
            declivity: 0.0,
            service_rate_mps2: default_service_rate(),
            emergency_deceleration_mps2: default_emergency_rate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    #[serde(default = "default_tick")]
    pub tick_s: f64,
    #[serde(default = "default_duration")]
    pub duration_s: f64,
    /// Track position of the end of the movement authority [m].
    #[serde(default)]
    pub end_of_authority_m: Option<f64>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            tick_s: default_tick(),
            duration_s: default_duration(),
            end_of_authority_m: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSignal {
    pub position_m: f64,
    #[serde(default)]
    pub aspect: SignalAspect,
    #[serde(default)]
    pub limit_kph: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSpeedPost {
    pub position_m: f64,
    pub limit_kph: f64,
    #[serde(default)]
    pub warning: bool,
    #[serde(default)]
    pub category: SpeedPostCategory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineSpeedSection {
    pub from_m: f64,
    pub kph: f64,
}

/// Desired speed from `at_s` on.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePoint {
    pub at_s: f64,
    pub speed_kph: f64,
}

/// Driver or vehicle input changed at `at_s`, held until changed again.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Action {
    pub at_s: f64,
    pub control: Control,
    pub value: ActionValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    VacmaPressed,
    RsoAcknowledge,
    RsoCancel,
    Rearm,
    TvmArm,
    TvmDisarm,
    TvmCovitInhibited,
    Horn,
    ThrottlePercent,
    DynamicBrakePercent,
    DriverClosingOrder,
    DriverOpeningOrder,
    DriverClosingAuthorization,
    PantographUp,
    DieselEngineRunning,
    ServiceRetention,
    DirectionReversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    Flag(bool),
    Number(f64),
}

impl ActionValue {
    fn flag(self) -> bool {
        match self {
            Self::Flag(b) => b,
            Self::Number(n) => n != 0.0,
        }
    }

    fn number(self) -> f64 {
        match self {
            Self::Flag(b) => f64::from(u8::from(b)),
            Self::Number(n) => n,
        }
    }
}

/// Message delivered on the inter-unit link at `at_s`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InboundMessage {
    pub at_s: f64,
    pub message: UnitMessage,
}

fn default_length() -> f64 {
    200.0
}
fn default_line_speed() -> f64 {
    160.0
}
fn default_service_rate() -> f64 {
    0.5
}
fn default_emergency_rate() -> f64 {
    1.0
}
fn default_tick() -> f64 {
    0.1
}
fn default_duration() -> f64 {
    60.0
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScenarioError::FileNotFound(path.to_path_buf())
            } else {
                ScenarioError::Io(e.to_string())
            }
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate. Track items are sorted by position.
    pub fn from_toml(content: &str) -> Result<Self, ScenarioError> {
        let mut scenario: Self =
            toml::from_str(content).map_err(|e| ScenarioError::ParseError(e.to_string()))?;
        scenario.validate()?;
        scenario
            .signals
            .sort_by(|a, b| a.position_m.total_cmp(&b.position_m));
        scenario
            .speed_posts
            .sort_by(|a, b| a.position_m.total_cmp(&b.position_m));
        scenario
            .line_speeds
            .sort_by(|a, b| a.from_m.total_cmp(&b.from_m));
        scenario.profile.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));
        scenario.actions.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));
        scenario.inbound.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));
        Ok(scenario)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        let positive = |key: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ScenarioError::ValidationError(format!("{key} must be positive, got {v}")))
            }
        };
        positive("run.tick_s", self.run.tick_s)?;
        positive("run.duration_s", self.run.duration_s)?;
        positive("train.length_m", self.train.length_m)?;
        positive("train.service_rate_mps2", self.train.service_rate_mps2)?;
        positive(
            "train.emergency_deceleration_mps2",
            self.train.emergency_deceleration_mps2,
        )?;
        let finite = self
            .signals
            .iter()
            .map(|s| s.position_m)
            .chain(self.speed_posts.iter().map(|p| p.position_m))
            .chain(self.line_speeds.iter().map(|l| l.from_m))
            .all(f64::is_finite);
        if !finite {
            return Err(ScenarioError::ValidationError(
                "track positions must be finite".to_string(),
            ));
        }
        for signal in &self.signals {
            let mut checked = SignalObservation::new(signal.position_m, signal.aspect);
            for tag in &signal.tags {
                checked.add_tag(tag).map_err(|e| {
                    ScenarioError::ValidationError(format!(
                        "signal at {} m: {e}",
                        signal.position_m
                    ))
                })?;
            }
        }
        let speeds_ok = std::iter::once(self.train.initial_speed_kph)
            .chain(self.profile.iter().map(|p| p.speed_kph))
            .chain(self.line_speeds.iter().map(|l| l.kph))
            .chain(std::iter::once(self.train.line_speed_kph))
            .all(|v| v.is_finite() && v >= 0.0);
        if !speeds_ok {
            return Err(ScenarioError::ValidationError(
                "speeds must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Runner ─────────────────────────────────────────────────────────

/// One tick of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub time_s: f64,
    pub position_m: f64,
    pub speed_kph: f64,
    pub commands: TcsCommands,
}

/// Drives an [`OnboardTcs`] through a [`Scenario`].
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    scenario: Scenario,
    tcs: OnboardTcs,
    time_s: f64,
    position_m: f64,
    speed_mps: f64,
    controls: CabControls,
    power: PowerInputs,
    direction_reversed: bool,
    braking: bool,
    next_action: usize,
    next_inbound: usize,
}

impl ScenarioRunner {
    pub fn new(scenario: Scenario, config: &LoadedConfig) -> Self {
        let speed_mps = kph_to_mps(scenario.train.initial_speed_kph);
        Self {
            scenario,
            tcs: OnboardTcs::new(config),
            time_s: 0.0,
            position_m: 0.0,
            speed_mps,
            controls: CabControls::default(),
            power: PowerInputs::default(),
            direction_reversed: false,
            braking: false,
            next_action: 0,
            next_inbound: 0,
        }
    }

    #[inline]
    pub const fn tcs(&self) -> &OnboardTcs {
        &self.tcs
    }

    #[inline]
    pub const fn stats(&self) -> &CycleStats {
        self.tcs.stats()
    }

    #[inline]
    pub const fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn finished(&self) -> bool {
        self.time_s >= self.scenario.run.duration_s - 1e-9
    }

    /// Advance one tick; `None` once the duration is reached.
    pub fn step(&mut self) -> Option<TickRecord> {
        if self.finished() {
            return None;
        }
        let dt = self.scenario.run.tick_s;
        self.time_s += dt;
        self.apply_actions();

        let v0 = self.speed_mps;
        let v1 = self.next_speed(dt);
        self.speed_mps = v1;
        let distance_m = 0.5 * (v0 + v1) * dt;
        self.position_m += distance_m;

        let inputs = self.host_inputs(dt, distance_m);
        let commands = self.tcs.update(&inputs);
        self.braking = commands.emergency_brake;

        Some(TickRecord {
            time_s: self.time_s,
            position_m: self.position_m,
            speed_kph: mps_to_kph(self.speed_mps),
            commands,
        })
    }

    /// Run to the end of the scenario.
    pub fn run(&mut self) -> Vec<TickRecord> {
        std::iter::from_fn(|| self.step()).collect()
    }

    fn apply_actions(&mut self) {
        while let Some(action) = self.scenario.actions.get(self.next_action) {
            if action.at_s > self.time_s + 1e-9 {
                break;
            }
            tracing::debug!(at_s = action.at_s, control = ?action.control, "scenario action");
            let (control, value) = (action.control, action.value);
            self.next_action += 1;
            self.set(control, value);
        }
    }

    fn set(&mut self, control: Control, value: ActionValue) {
        let c = &mut self.controls;
        let p = &mut self.power;
        match control {
            Control::VacmaPressed => c.vacma_pressed = value.flag(),
            Control::RsoAcknowledge => c.rso_acknowledge = value.flag(),
            Control::RsoCancel => c.rso_cancel = value.flag(),
            Control::Rearm => c.rearm = value.flag(),
            Control::TvmArm => c.tvm_arm = value.flag(),
            Control::TvmDisarm => c.tvm_disarm = value.flag(),
            Control::TvmCovitInhibited => c.tvm_covit_inhibited = value.flag(),
            Control::Horn => c.horn = value.flag(),
            Control::ThrottlePercent => c.throttle_percent = value.number(),
            Control::DynamicBrakePercent => c.dynamic_brake_percent = value.number(),
            Control::DriverClosingOrder => p.driver_closing_order = value.flag(),
            Control::DriverOpeningOrder => p.driver_opening_order = value.flag(),
            Control::DriverClosingAuthorization => p.driver_closing_authorization = value.flag(),
            Control::PantographUp => p.pantograph_up = value.flag(),
            Control::DieselEngineRunning => p.diesel_engine_running = value.flag(),
            Control::ServiceRetention => p.service_retention = value.flag(),
            Control::DirectionReversed => self.direction_reversed = value.flag(),
        }
    }

    fn desired_mps(&self) -> f64 {
        self.scenario
            .profile
            .iter()
            .take_while(|p| p.at_s <= self.time_s + 1e-9)
            .last()
            .map_or(self.speed_mps, |p| kph_to_mps(p.speed_kph))
    }

    fn next_speed(&self, dt: f64) -> f64 {
        let train = &self.scenario.train;
        let v = self.speed_mps;
        if self.braking {
            return (v - train.emergency_deceleration_mps2 * dt).max(0.0);
        }
        let target = self.desired_mps();
        let step = train.service_rate_mps2 * dt;
        if v < target {
            (v + step).min(target)
        } else {
            (v - step).max(target)
        }
    }

    fn line_speed_mps(&self) -> f64 {
        let kph = self
            .scenario
            .line_speeds
            .iter()
            .take_while(|l| l.from_m <= self.position_m)
            .last()
            .map_or(self.scenario.train.line_speed_kph, |l| l.kph);
        kph_to_mps(kph)
    }

    fn host_inputs(&mut self, dt: f64, distance_m: f64) -> HostInputs {
        let position = self.position_m;
        let mut inputs = HostInputs {
            elapsed_s: dt,
            distance_m,
            speed_mps: self.speed_mps,
            declivity: self.scenario.train.declivity,
            train_length_m: self.scenario.train.length_m,
            line_speed_limit_mps: self.line_speed_mps(),
            direction_reversed: self.direction_reversed,
            controls: self.controls,
            power: self.power,
            ..Default::default()
        };

        for s in self
            .scenario
            .signals
            .iter()
            .filter(|s| s.position_m > position)
            .take(MAX_SIGNALS_AHEAD)
        {
            let mut obs = SignalObservation::new(s.position_m - position, s.aspect);
            if let Some(kph) = s.limit_kph {
                obs = obs.with_speed_limit(kph_to_mps(kph));
            }
            for tag in &s.tags {
                obs = obs.with_tag(tag);
            }
            if inputs.signals.push(obs).is_err() {
                break;
            }
        }

        inputs.next_speed_post = self
            .scenario
            .speed_posts
            .iter()
            .find(|p| p.position_m > position)
            .map(|p| SpeedPostObservation {
                distance_m: p.position_m - position,
                limit_mps: kph_to_mps(p.limit_kph),
                warning: p.warning,
                category: p.category,
            });
        inputs.end_of_authority_m = self
            .scenario
            .run
            .end_of_authority_m
            .map(|eoa| (eoa - position).max(0.0));

        if let Some(m) = self.scenario.inbound.get(self.next_inbound) {
            if m.at_s <= self.time_s + 1e-9 {
                inputs.inbound = Some(m.message);
                self.next_inbound += 1;
            }
        }
        inputs
    }
}
