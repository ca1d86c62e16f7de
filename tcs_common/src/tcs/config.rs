//! Parameter file layout for one on-board unit.
//!
//! All config types use `serde::Deserialize` for TOML loading. Every key has
//! a default so a minimal file only names what differs from the standard
//! unit. Numeric parameters have const `MIN`/`MAX` bounds checked by
//! [`TcsConfig::validate`].
//!
//! ```toml
//! [shared]
//! service_name = "bb-26000"
//!
//! [general]
//! tvm = "tvm430"
//!
//! [kvb]
//! train_speed_limit_kph = 200.0
//! electropneumatic_brake = true
//!
//! [vacma]
//! released_alert_delay_s = 2.5
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};

use super::state::{PowerSupplyKind, TvmKind, UnitRole};

// ─── Bounds ─────────────────────────────────────────────────────────

pub const BREAKER_CLOSING_DELAY_DEFAULT: f64 = 2.0;
pub const BREAKER_CLOSING_DELAY_MIN: f64 = 0.0;
pub const BREAKER_CLOSING_DELAY_MAX: f64 = 30.0;

pub const RSO_EMERGENCY_DELAY_DEFAULT: f64 = 4.0;
pub const RSO_EMERGENCY_DELAY_MIN: f64 = 1.0;
pub const RSO_EMERGENCY_DELAY_MAX: f64 = 30.0;
pub const BLINK_FREQUENCY_DEFAULT: f64 = 1.0;
pub const BLINK_FREQUENCY_MIN: f64 = 0.1;
pub const BLINK_FREQUENCY_MAX: f64 = 10.0;

pub const TRAIN_SPEED_LIMIT_DEFAULT: f64 = 160.0;
pub const TRAIN_SPEED_LIMIT_MIN: f64 = 10.0;
pub const TRAIN_SPEED_LIMIT_MAX: f64 = 350.0;
pub const SAFE_DECELERATION_DEFAULT: f64 = 0.7;
pub const SAFE_DECELERATION_MIN: f64 = 0.1;
pub const SAFE_DECELERATION_MAX: f64 = 3.0;
pub const TRAIN_LENGTH_MIN: f64 = 1.0;
pub const TRAIN_LENGTH_MAX: f64 = 1500.0;

pub const TVM_REACTION_DELAY_DEFAULT: f64 = 0.0;
pub const TVM_REACTION_DELAY_MIN: f64 = 0.0;
pub const TVM_REACTION_DELAY_MAX: f64 = 10.0;

pub const VACMA_ACTIVATION_SPEED_DEFAULT: f64 = 3.0;
pub const VACMA_ACTIVATION_SPEED_MIN: f64 = 0.0;
pub const VACMA_ACTIVATION_SPEED_MAX: f64 = 30.0;
pub const VACMA_RELEASED_ALERT_DEFAULT: f64 = 2.5;
pub const VACMA_RELEASED_EMERGENCY_DEFAULT: f64 = 5.0;
pub const VACMA_PRESSED_ALERT_DEFAULT: f64 = 55.0;
pub const VACMA_PRESSED_EMERGENCY_DEFAULT: f64 = 60.0;
pub const VACMA_DELAY_MIN: f64 = 0.5;
pub const VACMA_DELAY_MAX: f64 = 120.0;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete parameter set of one unit. Immutable after initialisation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TcsConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub rso: RsoConfig,
    #[serde(default)]
    pub kvb: KvbConfig,
    #[serde(default)]
    pub tvm: TvmConfig,
    #[serde(default)]
    pub vacma: VacmaConfig,
}

impl TcsConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        check_range(
            "breaker.closing_delay_s",
            self.breaker.closing_delay_s,
            BREAKER_CLOSING_DELAY_MIN,
            BREAKER_CLOSING_DELAY_MAX,
        )?;
        check_range(
            "rso.emergency_delay_s",
            self.rso.emergency_delay_s,
            RSO_EMERGENCY_DELAY_MIN,
            RSO_EMERGENCY_DELAY_MAX,
        )?;
        check_range(
            "rso.blink_frequency_hz",
            self.rso.blink_frequency_hz,
            BLINK_FREQUENCY_MIN,
            BLINK_FREQUENCY_MAX,
        )?;
        self.kvb.validate()?;
        check_range(
            "tvm.reaction_delay_s",
            self.tvm.reaction_delay_s,
            TVM_REACTION_DELAY_MIN,
            TVM_REACTION_DELAY_MAX,
        )?;
        check_range(
            "tvm.blink_frequency_hz",
            self.tvm.blink_frequency_hz,
            BLINK_FREQUENCY_MIN,
            BLINK_FREQUENCY_MAX,
        )?;
        self.vacma.validate()
    }
}

fn check_range(key: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::ValidationError(format!(
            "{key} {value} out of range [{min}, {max}]"
        )));
    }
    Ok(())
}

// ─── Sections ───────────────────────────────────────────────────────

/// Equipment fitted on the unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub rso: bool,
    #[serde(default = "default_true")]
    pub kvb: bool,
    #[serde(default)]
    pub tvm: TvmKind,
    #[serde(default = "default_true")]
    pub vacma: bool,
    #[serde(default)]
    pub power_supply: PowerSupplyKind,
    #[serde(default)]
    pub role: UnitRole,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            rso: true,
            kvb: true,
            tvm: TvmKind::None,
            vacma: true,
            power_supply: PowerSupplyKind::Electric,
            role: UnitRole::Leader,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerConfig {
    /// Time the closing order must be held with authorisation [s].
    #[serde(default = "default_closing_delay")]
    pub closing_delay_s: f64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            closing_delay_s: BREAKER_CLOSING_DELAY_DEFAULT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RsoConfig {
    /// Time allowed for acknowledgement before emergency braking [s].
    #[serde(default = "default_rso_delay")]
    pub emergency_delay_s: f64,
    #[serde(default = "default_blink_frequency")]
    pub blink_frequency_hz: f64,
}

impl Default for RsoConfig {
    fn default() -> Self {
        Self {
            emergency_delay_s: RSO_EMERGENCY_DELAY_DEFAULT,
            blink_frequency_hz: BLINK_FREQUENCY_DEFAULT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KvbConfig {
    /// Maximum speed of the rolling stock [km/h].
    #[serde(default = "default_train_speed_limit")]
    pub train_speed_limit_kph: f64,
    /// Fixed train length [m]; when absent the host-reported length is used.
    #[serde(default)]
    pub train_length_m: Option<f64>,
    #[serde(default)]
    pub electropneumatic_brake: bool,
    #[serde(default)]
    pub heavy_freight: bool,
    /// Guaranteed deceleration used in braking curves [m/s²].
    #[serde(default = "default_safe_deceleration")]
    pub safe_deceleration_mps2: f64,
}

impl Default for KvbConfig {
    fn default() -> Self {
        Self {
            train_speed_limit_kph: TRAIN_SPEED_LIMIT_DEFAULT,
            train_length_m: None,
            electropneumatic_brake: false,
            heavy_freight: false,
            safe_deceleration_mps2: SAFE_DECELERATION_DEFAULT,
        }
    }
}

impl KvbConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "kvb.train_speed_limit_kph",
            self.train_speed_limit_kph,
            TRAIN_SPEED_LIMIT_MIN,
            TRAIN_SPEED_LIMIT_MAX,
        )?;
        check_range(
            "kvb.safe_deceleration_mps2",
            self.safe_deceleration_mps2,
            SAFE_DECELERATION_MIN,
            SAFE_DECELERATION_MAX,
        )?;
        if let Some(len) = self.train_length_m {
            check_range("kvb.train_length_m", len, TRAIN_LENGTH_MIN, TRAIN_LENGTH_MAX)?;
        }
        if self.electropneumatic_brake && self.heavy_freight {
            return Err(ConfigError::ValidationError(
                "kvb.electropneumatic_brake and kvb.heavy_freight are exclusive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TvmConfig {
    /// Decoding table file, relative to the config directory.
    /// When absent the built-in table for `general.tvm` is used.
    #[serde(default)]
    pub decoding_table: Option<String>,
    /// Reaction delay used in TVM430 curves [s].
    #[serde(default = "default_tvm_reaction_delay")]
    pub reaction_delay_s: f64,
    #[serde(default = "default_blink_frequency")]
    pub blink_frequency_hz: f64,
}

impl Default for TvmConfig {
    fn default() -> Self {
        Self {
            decoding_table: None,
            reaction_delay_s: TVM_REACTION_DELAY_DEFAULT,
            blink_frequency_hz: BLINK_FREQUENCY_DEFAULT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VacmaConfig {
    /// Speed above which vigilance is monitored [km/h].
    #[serde(default = "default_vacma_activation")]
    pub activation_speed_kph: f64,
    #[serde(default = "default_released_alert")]
    pub released_alert_delay_s: f64,
    #[serde(default = "default_released_emergency")]
    pub released_emergency_delay_s: f64,
    #[serde(default = "default_pressed_alert")]
    pub pressed_alert_delay_s: f64,
    #[serde(default = "default_pressed_emergency")]
    pub pressed_emergency_delay_s: f64,
}

impl Default for VacmaConfig {
    fn default() -> Self {
        Self {
            activation_speed_kph: VACMA_ACTIVATION_SPEED_DEFAULT,
            released_alert_delay_s: VACMA_RELEASED_ALERT_DEFAULT,
            released_emergency_delay_s: VACMA_RELEASED_EMERGENCY_DEFAULT,
            pressed_alert_delay_s: VACMA_PRESSED_ALERT_DEFAULT,
            pressed_emergency_delay_s: VACMA_PRESSED_EMERGENCY_DEFAULT,
        }
    }
}

impl VacmaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "vacma.activation_speed_kph",
            self.activation_speed_kph,
            VACMA_ACTIVATION_SPEED_MIN,
            VACMA_ACTIVATION_SPEED_MAX,
        )?;
        for (key, value) in [
            ("vacma.released_alert_delay_s", self.released_alert_delay_s),
            ("vacma.released_emergency_delay_s", self.released_emergency_delay_s),
            ("vacma.pressed_alert_delay_s", self.pressed_alert_delay_s),
            ("vacma.pressed_emergency_delay_s", self.pressed_emergency_delay_s),
        ] {
            check_range(key, value, VACMA_DELAY_MIN, VACMA_DELAY_MAX)?;
        }
        if self.released_alert_delay_s >= self.released_emergency_delay_s {
            return Err(ConfigError::ValidationError(
                "vacma released alert delay must be shorter than emergency delay".to_string(),
            ));
        }
        if self.pressed_alert_delay_s >= self.pressed_emergency_delay_s {
            return Err(ConfigError::ValidationError(
                "vacma pressed alert delay must be shorter than emergency delay".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_closing_delay() -> f64 {
    BREAKER_CLOSING_DELAY_DEFAULT
}
fn default_rso_delay() -> f64 {
    RSO_EMERGENCY_DELAY_DEFAULT
}
fn default_blink_frequency() -> f64 {
    BLINK_FREQUENCY_DEFAULT
}
fn default_train_speed_limit() -> f64 {
    TRAIN_SPEED_LIMIT_DEFAULT
}
fn default_safe_deceleration() -> f64 {
    SAFE_DECELERATION_DEFAULT
}
fn default_tvm_reaction_delay() -> f64 {
    TVM_REACTION_DELAY_DEFAULT
}
fn default_vacma_activation() -> f64 {
    VACMA_ACTIVATION_SPEED_DEFAULT
}
fn default_released_alert() -> f64 {
    VACMA_RELEASED_ALERT_DEFAULT
}
fn default_released_emergency() -> f64 {
    VACMA_RELEASED_EMERGENCY_DEFAULT
}
fn default_pressed_alert() -> f64 {
    VACMA_PRESSED_ALERT_DEFAULT
}
fn default_pressed_emergency() -> f64 {
    VACMA_PRESSED_EMERGENCY_DEFAULT
}
