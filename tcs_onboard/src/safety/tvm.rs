//! TVM300 / TVM430 continuous cab signalling.
//!
//! Block markers carry a `TVM:<ve>/<vc>/<va>` tag describing the block that
//! ends at the marker. The nearest marker ahead therefore gives the code of
//! the block the train is running in and the distance to its end.

pub mod arming;
pub mod covit;
pub mod table;

use tcs_common::consts::kph_to_mps;
use tcs_common::host::{SignalObservation, SignalTag};
use tcs_common::tcs::config::TvmConfig;
use tcs_common::tcs::state::{TvmArming, TvmKind};

use self::arming::{ARM_TAG, ArmingInputs, ArmingMachine, DISARM_TAG};
use self::covit::{BlockLimits, Covit, CovitInputs};
use self::table::{TvmAspectKind, TvmCode, TvmEntry, TvmSpeed, TvmTable};
use crate::primitives::Blinker;

/// Prefix of block-marker tags.
pub const CODE_TAG: &str = "TVM:";

/// Inputs for one TVM tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TvmInputs<'a> {
    pub speed_mps: f64,
    pub line_speed_mps: f64,
    /// Signals ahead, nearest first.
    pub signals: &'a [SignalObservation],
    pub passed: Option<&'a SignalObservation>,
    pub arm_button: bool,
    pub disarm_button: bool,
    pub covit_inhibited: bool,
    /// Arming order relayed by the leading unit.
    pub remote_arming: Option<bool>,
}

/// What changed during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TvmUpdate {
    pub arming: Option<TvmArming>,
    pub aspect_changed: bool,
    pub emergency: Option<bool>,
}

/// TVM subsystem state.
#[derive(Debug, Clone)]
pub struct Tvm {
    kind: TvmKind,
    table: TvmTable,
    reaction_delay_s: f64,
    arming: ArmingMachine,
    covit: Covit,
    covit_inhibited: bool,
    entry: TvmEntry,
    /// Code text of the marker `entry` was decoded from.
    marker_code: SignalTag,
    block_end_m: f64,
    limits: BlockLimits,
    blinker: Blinker,
}

impl Tvm {
    /// New disarmed TVM decoding with `table`.
    pub fn new(kind: TvmKind, config: &TvmConfig, table: TvmTable) -> Self {
        Self {
            kind,
            table,
            reaction_delay_s: config.reaction_delay_s,
            arming: ArmingMachine::new(),
            covit: Covit::new(),
            covit_inhibited: false,
            entry: TvmEntry::FALLBACK,
            marker_code: SignalTag::new(),
            block_end_m: 0.0,
            limits: BlockLimits::compute(kind, &TvmEntry::FALLBACK, 0.0, config.reaction_delay_s),
            blinker: Blinker::new(config.blink_frequency_hz),
        }
    }

    #[inline]
    pub const fn kind(&self) -> TvmKind {
        self.kind
    }

    #[inline]
    pub const fn is_armed(&self) -> bool {
        self.arming.is_armed()
    }

    /// Armed with overspeed supervision active.
    #[inline]
    pub const fn covit_active(&self) -> bool {
        self.arming.is_armed() && !self.covit_inhibited
    }

    #[inline]
    pub const fn emergency_braking(&self) -> bool {
        self.covit.emergency_braking()
    }

    #[inline]
    pub const fn spad(&self) -> bool {
        self.covit.spad()
    }

    #[inline]
    pub const fn entry(&self) -> &TvmEntry {
        &self.entry
    }

    #[inline]
    pub const fn limits(&self) -> &BlockLimits {
        &self.limits
    }

    /// Distance to the end of the current block [m].
    #[inline]
    pub const fn block_end_m(&self) -> f64 {
        self.block_end_m
    }

    /// Execution speed of the current block for the cab display.
    pub fn current_limit_mps(&self) -> Option<f64> {
        self.is_armed().then(|| kph_to_mps(self.entry.code.ve.kph()))
    }

    /// Announced speed for the next block.
    pub fn next_limit_mps(&self) -> Option<f64> {
        self.is_armed().then(|| kph_to_mps(self.entry.aspect.kph()))
    }

    pub fn aspect_kind(&self) -> TvmAspectKind {
        if self.is_armed() {
            self.entry.kind
        } else {
            TvmAspectKind::None
        }
    }

    /// Displayed aspect speed [km/h] while armed.
    pub fn aspect_kph(&self) -> Option<f64> {
        self.is_armed().then(|| self.entry.aspect.kph())
    }

    pub fn blink_on(&self) -> bool {
        self.is_armed() && self.entry.blinking && self.blinker.on()
    }

    /// Advance one tick.
    pub fn update(&mut self, inputs: &TvmInputs<'_>, elapsed_s: f64) -> TvmUpdate {
        let mut update = TvmUpdate::default();
        self.covit_inhibited = inputs.covit_inhibited;

        let passed = inputs.passed;
        update.arming = self.arming.update(&ArmingInputs {
            line_speed_mps: inputs.line_speed_mps,
            arm_beacon: passed.is_some_and(|s| s.has_tag(ARM_TAG)),
            disarm_beacon: passed.is_some_and(|s| s.has_tag(DISARM_TAG)),
            arm_button: inputs.arm_button,
            disarm_button: inputs.disarm_button,
            remote: inputs.remote_arming,
        });

        let marker = inputs
            .signals
            .iter()
            .find_map(|s| s.tag_value(CODE_TAG).map(|code| (s.distance_m, code)));
        if let Some((distance_m, code)) = marker {
            if self.marker_code.as_str() != code {
                tracing::debug!(code, "TVM block code");
                let entry = self.table.decode(code);
                if entry.code != self.entry.code || entry.fallback != self.entry.fallback {
                    update.aspect_changed = self.is_armed();
                    self.entry = entry;
                }
                self.marker_code = SignalTag::try_from(code).unwrap_or_default();
            }
            self.block_end_m = distance_m.max(0.0);
        }

        if self.entry.blinking {
            self.blinker.start();
        } else {
            self.blinker.stop();
        }
        self.blinker.update(elapsed_s);

        let spad = passed
            .and_then(|s| s.tag_value(CODE_TAG))
            .and_then(TvmCode::parse)
            .is_some_and(|code| code.ve == TvmSpeed::S000);

        self.limits = BlockLimits::compute(self.kind, &self.entry, self.block_end_m, self.reaction_delay_s);
        update.emergency = self.covit.update(
            &CovitInputs {
                speed_mps: inputs.speed_mps,
                armed: self.is_armed(),
                inhibited: inputs.covit_inhibited,
                spad,
            },
            &self.limits,
        );
        update
    }
}
