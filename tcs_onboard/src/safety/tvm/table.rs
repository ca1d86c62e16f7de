//! TVM speed-triplet decoding tables.
//!
//! A block code is the triplet `Ve/Vc/Va`: speed at block entry, speed to
//! reach at block exit, speed announced for the following block. The table
//! maps every known triplet to the cab aspect and the supervision data.
//! Any triplet missing from the table decodes to the restrictive fallback
//! (aspect `000`, 35 km/h emergency, 30 km/h reset).

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use tcs_common::config::ConfigError;
use tcs_common::consts::{TVM_FALLBACK_EMERGENCY_KPH, TVM_FALLBACK_RESET_KPH};
use tcs_common::tcs::state::TvmKind;

// ─── Coded speeds ───────────────────────────────────────────────────

/// One coded TVM speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TvmSpeed {
    /// Speed reduction with stop ahead, no proceed.
    Rrr,
    S000,
    S030,
    S060,
    S080,
    S100,
    S130,
    S160,
    S170,
    S200,
    S220,
    S230,
    S270,
    S300,
    S320,
}

impl TvmSpeed {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "RRR" => Self::Rrr,
            "000" => Self::S000,
            "030" => Self::S030,
            "060" => Self::S060,
            "080" => Self::S080,
            "100" => Self::S100,
            "130" => Self::S130,
            "160" => Self::S160,
            "170" => Self::S170,
            "200" => Self::S200,
            "220" => Self::S220,
            "230" => Self::S230,
            "270" => Self::S270,
            "300" => Self::S300,
            "320" => Self::S320,
            _ => return None,
        })
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Rrr => "RRR",
            Self::S000 => "000",
            Self::S030 => "030",
            Self::S060 => "060",
            Self::S080 => "080",
            Self::S100 => "100",
            Self::S130 => "130",
            Self::S160 => "160",
            Self::S170 => "170",
            Self::S200 => "200",
            Self::S220 => "220",
            Self::S230 => "230",
            Self::S270 => "270",
            Self::S300 => "300",
            Self::S320 => "320",
        }
    }

    /// Nominal speed [km/h]. `RRR` and `000` are zero.
    pub const fn kph(self) -> f64 {
        match self {
            Self::Rrr | Self::S000 => 0.0,
            Self::S030 => 30.0,
            Self::S060 => 60.0,
            Self::S080 => 80.0,
            Self::S100 => 100.0,
            Self::S130 => 130.0,
            Self::S160 => 160.0,
            Self::S170 => 170.0,
            Self::S200 => 200.0,
            Self::S220 => 220.0,
            Self::S230 => 230.0,
            Self::S270 => 270.0,
            Self::S300 => 300.0,
            Self::S320 => 320.0,
        }
    }

    #[inline]
    pub const fn is_stop(self) -> bool {
        matches!(self, Self::Rrr | Self::S000)
    }

    /// Emergency speed of the built-in tables: +10 km/h up to 160, +15 above,
    /// 35 km/h for stop codes.
    pub const fn default_emergency_kph(self) -> f64 {
        let v = self.kph();
        if self.is_stop() {
            TVM_FALLBACK_EMERGENCY_KPH
        } else if v <= 160.0 {
            v + 10.0
        } else {
            v + 15.0
        }
    }
}

impl fmt::Display for TvmSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ─── Triplet ────────────────────────────────────────────────────────

/// Coded block triplet `Ve/Vc/Va`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TvmCode {
    pub ve: TvmSpeed,
    pub vc: TvmSpeed,
    pub va: TvmSpeed,
}

impl TvmCode {
    pub const FALLBACK: Self = Self::new(TvmSpeed::S000, TvmSpeed::S000, TvmSpeed::S000);

    pub const fn new(ve: TvmSpeed, vc: TvmSpeed, va: TvmSpeed) -> Self {
        Self { ve, vc, va }
    }

    /// Parse `ve/vc/va`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('/');
        let ve = TvmSpeed::from_code(parts.next()?.trim())?;
        let vc = TvmSpeed::from_code(parts.next()?.trim())?;
        let va = TvmSpeed::from_code(parts.next()?.trim())?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { ve, vc, va })
    }
}

impl fmt::Display for TvmCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.ve, self.vc, self.va)
    }
}

// ─── Entries ────────────────────────────────────────────────────────

/// Colour class of the cab aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TvmAspectKind {
    #[default]
    None = 0,
    /// Speed maintained (green background).
    Green = 1,
    /// Lower speed announced (black on white).
    Announce = 2,
    /// Stop (red).
    Stop = 3,
}

impl TvmAspectKind {
    /// Aspect class implied by a triplet.
    pub const fn of(code: TvmCode) -> Self {
        if code.va.is_stop() && code.ve.is_stop() {
            Self::Stop
        } else if code.va.kph() < code.ve.kph() {
            Self::Announce
        } else {
            Self::Green
        }
    }
}

/// Decoded supervision data for one triplet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TvmEntry {
    pub code: TvmCode,
    /// Speed shown in the cab (`Va`).
    pub aspect: TvmSpeed,
    pub kind: TvmAspectKind,
    pub blinking: bool,
    /// Emergency speed associated with `Ve` [km/h].
    pub emergency_ve_kph: f64,
    /// Emergency speed associated with `Vc` [km/h].
    pub emergency_vc_kph: f64,
    /// Braking-curve deceleration for TVM430 [m/s²].
    pub deceleration_mps2: f64,
    /// Produced by a decode failure.
    pub fallback: bool,
}

impl TvmEntry {
    /// Restrictive entry used for anything the table cannot decode.
    pub const FALLBACK: Self = Self {
        code: TvmCode::FALLBACK,
        aspect: TvmSpeed::S000,
        kind: TvmAspectKind::Stop,
        blinking: false,
        emergency_ve_kph: TVM_FALLBACK_EMERGENCY_KPH,
        emergency_vc_kph: TVM_FALLBACK_EMERGENCY_KPH,
        deceleration_mps2: DEFAULT_DECELERATION_LOW,
        fallback: true,
    };

    /// Entry derived from the triplet with built-in margins.
    pub fn derived(code: TvmCode, deceleration_mps2: f64) -> Self {
        Self {
            code,
            aspect: code.va,
            kind: TvmAspectKind::of(code),
            blinking: code.vc.kph() < code.ve.kph(),
            emergency_ve_kph: code.ve.default_emergency_kph(),
            emergency_vc_kph: code.vc.default_emergency_kph(),
            deceleration_mps2,
            fallback: false,
        }
    }

    /// Reset speed at block entry [km/h]: unmargined `Ve`, 30 km/h when
    /// falling back.
    pub fn reset_ve_kph(&self) -> f64 {
        if self.fallback || self.code.ve.is_stop() {
            TVM_FALLBACK_RESET_KPH
        } else {
            self.code.ve.kph()
        }
    }

    /// Reset speed at block exit [km/h].
    pub fn reset_vc_kph(&self) -> f64 {
        if self.fallback || self.code.vc.is_stop() {
            TVM_FALLBACK_RESET_KPH
        } else {
            self.code.vc.kph()
        }
    }
}

// ─── Built-in tables ────────────────────────────────────────────────

const DEFAULT_DECELERATION_HIGH: f64 = 0.6;
const DEFAULT_DECELERATION_LOW: f64 = 0.7;

/// Speed ladder of the TVM300 line code.
const TVM300_LADDER: [TvmSpeed; 6] = [
    TvmSpeed::S300,
    TvmSpeed::S270,
    TvmSpeed::S220,
    TvmSpeed::S160,
    TvmSpeed::S080,
    TvmSpeed::S000,
];

/// Speed ladder of the TVM430 line code.
const TVM430_LADDER: [TvmSpeed; 13] = [
    TvmSpeed::S320,
    TvmSpeed::S300,
    TvmSpeed::S270,
    TvmSpeed::S230,
    TvmSpeed::S200,
    TvmSpeed::S170,
    TvmSpeed::S160,
    TvmSpeed::S130,
    TvmSpeed::S100,
    TvmSpeed::S080,
    TvmSpeed::S060,
    TvmSpeed::S030,
    TvmSpeed::S000,
];

/// Skip-a-step announcements found on short blocks.
const TVM300_EXTRA: [TvmCode; 4] = [
    TvmCode::new(TvmSpeed::S300, TvmSpeed::S300, TvmSpeed::S220),
    TvmCode::new(TvmSpeed::S270, TvmSpeed::S270, TvmSpeed::S160),
    TvmCode::new(TvmSpeed::S220, TvmSpeed::S220, TvmSpeed::S080),
    TvmCode::new(TvmSpeed::S160, TvmSpeed::S160, TvmSpeed::S000),
];

fn ladder_deceleration(ve: TvmSpeed) -> f64 {
    if ve.kph() > 160.0 {
        DEFAULT_DECELERATION_HIGH
    } else {
        DEFAULT_DECELERATION_LOW
    }
}

// ─── Table ──────────────────────────────────────────────────────────

/// Triplet lookup table for one TVM generation.
#[derive(Debug, Clone, PartialEq)]
pub struct TvmTable {
    entries: BTreeMap<TvmCode, TvmEntry>,
}

impl TvmTable {
    /// Built-in table for `kind`. Empty for [`TvmKind::None`].
    pub fn builtin(kind: TvmKind) -> Self {
        let mut table = Self {
            entries: BTreeMap::new(),
        };
        match kind {
            TvmKind::None => {}
            TvmKind::Tvm300 => {
                table.insert_ladder(&TVM300_LADDER);
                for code in TVM300_EXTRA {
                    table.insert(TvmEntry::derived(code, ladder_deceleration(code.ve)));
                }
            }
            TvmKind::Tvm430 => table.insert_ladder(&TVM430_LADDER),
        }
        let rrr = TvmCode::new(TvmSpeed::Rrr, TvmSpeed::Rrr, TvmSpeed::Rrr);
        if kind != TvmKind::None {
            table.insert(TvmEntry::derived(rrr, DEFAULT_DECELERATION_LOW));
        }
        table
    }

    /// For each step `hi → lo` of the ladder: `hi/hi/hi` (green),
    /// `hi/hi/lo` (announce), `hi/lo/lo` (announce, blinking).
    fn insert_ladder(&mut self, ladder: &[TvmSpeed]) {
        for step in ladder.windows(2) {
            let (hi, lo) = (step[0], step[1]);
            let decel = ladder_deceleration(hi);
            for code in [
                TvmCode::new(hi, hi, hi),
                TvmCode::new(hi, hi, lo),
                TvmCode::new(hi, lo, lo),
            ] {
                self.insert(TvmEntry::derived(code, decel));
            }
        }
        if let Some(&last) = ladder.last() {
            self.insert(TvmEntry::derived(
                TvmCode::new(last, last, last),
                DEFAULT_DECELERATION_LOW,
            ));
        }
    }

    fn insert(&mut self, entry: TvmEntry) {
        self.entries.insert(entry.code, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, code: &TvmCode) -> bool {
        self.entries.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &TvmCode> {
        self.entries.keys()
    }

    /// Entry for `code`, or the fallback.
    pub fn lookup(&self, code: &TvmCode) -> TvmEntry {
        match self.entries.get(code) {
            Some(entry) => *entry,
            None => {
                tracing::warn!(%code, "TVM triplet not in table, fallback aspect");
                TvmEntry::FALLBACK
            }
        }
    }

    /// Decode a `ve/vc/va` text. Unparseable text yields the fallback.
    pub fn decode(&self, text: &str) -> TvmEntry {
        match TvmCode::parse(text) {
            Some(code) => self.lookup(&code),
            None => {
                tracing::warn!(text, "malformed TVM code, fallback aspect");
                TvmEntry::FALLBACK
            }
        }
    }

    /// Parse a decoding table file.
    ///
    /// ```toml
    /// [[entry]]
    /// code = "300/270/270"
    /// emergency_ve_kph = 315.0   # optional, derived from Ve
    /// emergency_vc_kph = 285.0   # optional, derived from Vc
    /// deceleration_mps2 = 0.6    # optional
    /// blinking = true            # optional, Vc < Ve
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: TableFile = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("TVM table: {e}")))?;
        if file.entry.is_empty() {
            return Err(ConfigError::ValidationError("TVM table has no entries".into()));
        }

        let mut table = Self {
            entries: BTreeMap::new(),
        };
        for raw in file.entry {
            let entry = raw.into_entry()?;
            if table.contains(&entry.code) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate TVM code {}",
                    entry.code
                )));
            }
            table.insert(entry);
        }
        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    #[serde(default)]
    entry: Vec<TableFileEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFileEntry {
    code: String,
    emergency_ve_kph: Option<f64>,
    emergency_vc_kph: Option<f64>,
    deceleration_mps2: Option<f64>,
    blinking: Option<bool>,
}

impl TableFileEntry {
    fn into_entry(self) -> Result<TvmEntry, ConfigError> {
        let code = TvmCode::parse(&self.code).ok_or_else(|| {
            ConfigError::ValidationError(format!("invalid TVM code '{}'", self.code))
        })?;
        let mut entry = TvmEntry::derived(code, ladder_deceleration(code.ve));
        if let Some(v) = self.emergency_ve_kph {
            entry.emergency_ve_kph = v;
        }
        if let Some(v) = self.emergency_vc_kph {
            entry.emergency_vc_kph = v;
        }
        if let Some(a) = self.deceleration_mps2 {
            entry.deceleration_mps2 = a;
        }
        if let Some(b) = self.blinking {
            entry.blinking = b;
        }

        let speeds_ok = [entry.emergency_ve_kph, entry.emergency_vc_kph]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0);
        if !speeds_ok {
            return Err(ConfigError::ValidationError(format!(
                "TVM code {code}: emergency speeds must be positive"
            )));
        }
        if !(entry.deceleration_mps2.is_finite() && entry.deceleration_mps2 > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "TVM code {code}: deceleration must be positive"
            )));
        }
        Ok(entry)
    }
}
