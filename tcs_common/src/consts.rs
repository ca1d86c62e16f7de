//! Workspace-wide constants.
//!
//! Single source of truth for physical constants and for the numeric values
//! taken from the French national train-protection rules. The regulatory
//! values below are behavioural contracts, not tuning knobs: none of them is
//! exposed through configuration.

use static_assertions::const_assert;

// ─── Physics & Units ────────────────────────────────────────────────

/// Standard gravity [m/s²].
pub const GRAVITY_MPS2: f64 = 9.81;

/// Conversion factor km/h → m/s.
pub const MPS_PER_KPH: f64 = 1.0 / 3.6;

/// Speed below which the train is considered stopped [m/s].
pub const STANDSTILL_SPEED_MPS: f64 = 0.1;

/// Convert km/h to m/s.
#[inline]
pub const fn kph_to_mps(kph: f64) -> f64 {
    kph * MPS_PER_KPH
}

/// Convert m/s to km/h.
#[inline]
pub const fn mps_to_kph(mps: f64) -> f64 {
    mps * 3.6
}

// ─── Host Sampling ──────────────────────────────────────────────────

/// Number of signals ahead sampled from the host each tick.
pub const MAX_SIGNALS_AHEAD: usize = 5;

/// Maximum number of text tags kept per signal observation.
pub const MAX_SIGNAL_TAGS: usize = 4;

/// Maximum length of one text tag. Fits `ZONE:PANTO:<start>:<length>` with
/// fractional metres on lines well beyond 100 km.
pub const SIGNAL_TAG_LEN: usize = 32;

/// Maximum indicator updates emitted per tick.
pub const MAX_INDICATORS: usize = 16;

/// Maximum sound/event triggers emitted per tick.
pub const MAX_EVENTS_PER_TICK: usize = 16;

// ─── KVB ────────────────────────────────────────────────────────────

/// Anticipation added to the brake-establishment delay for alert curves [s].
pub const KVB_ALERT_ANTICIPATION_S: f64 = 5.0;

/// Pre-announce threshold speed [km/h].
pub const KVB_PREANNOUNCE_THRESHOLD_KPH: f64 = 160.0;

/// Ceiling allowed while the pre-announce token is armed [km/h].
pub const KVB_PREANNOUNCE_CEILING_KPH: f64 = 220.0;

/// Distance under which an upcoming 160 km/h restriction triggers the token [m].
pub const KVB_PREANNOUNCE_DISTANCE_M: f64 = 3000.0;

/// On-sight ceiling after an emergency rearm [km/h].
pub const KVB_ON_SIGHT_KPH: f64 = 30.0;

/// Execution speed of class A [km/h].
pub const KVB_EXECUTION_A_KPH: f64 = 30.0;

/// Execution speed of class B [km/h].
pub const KVB_EXECUTION_B_KPH: f64 = 60.0;

/// Execution speed of class C [km/h].
pub const KVB_EXECUTION_C_KPH: f64 = 160.0;

/// V10 release speed [km/h].
pub const KVB_RELEASE_V10_KPH: f64 = 10.0;

/// V30 release speed [km/h].
pub const KVB_RELEASE_V30_KPH: f64 = 30.0;

/// Standard alert / emergency margins [km/h].
pub const KVB_ALERT_MARGIN_KPH: f64 = 5.0;
pub const KVB_EMERGENCY_MARGIN_KPH: f64 = 10.0;

/// Tight margins applied to V10 release stop targets [km/h].
pub const KVB_V10_ALERT_MARGIN_KPH: f64 = 2.5;
pub const KVB_V10_EMERGENCY_MARGIN_KPH: f64 = 5.0;

// ─── High-Speed Line Detection ──────────────────────────────────────

/// Line speed at or above which the high-speed-line mode is entered [km/h].
pub const HSL_ENTRY_THRESHOLD_KPH: f64 = 221.0;

/// Line speed at or below which the high-speed-line mode is left [km/h].
pub const HSL_EXIT_THRESHOLD_KPH: f64 = 220.0;

/// Distance the entry condition must hold before switching to HSL mode [m].
pub const HSL_ENTRY_DISTANCE_M: f64 = 200.0;

/// Distance the exit condition must hold before switching back [m].
pub const HSL_EXIT_DISTANCE_M: f64 = 450.0;

// ─── TVM ────────────────────────────────────────────────────────────

/// Emergency speed of the degraded fallback aspect [km/h].
pub const TVM_FALLBACK_EMERGENCY_KPH: f64 = 35.0;

/// Reset speed of the degraded fallback aspect [km/h].
pub const TVM_FALLBACK_RESET_KPH: f64 = 30.0;

// ─── Compile-time Consistency ───────────────────────────────────────

const_assert!(MAX_SIGNALS_AHEAD == 5);
const_assert!(KVB_PREANNOUNCE_THRESHOLD_KPH < KVB_PREANNOUNCE_CEILING_KPH);
const_assert!(KVB_PREANNOUNCE_CEILING_KPH < HSL_ENTRY_THRESHOLD_KPH);
const_assert!(HSL_EXIT_THRESHOLD_KPH < HSL_ENTRY_THRESHOLD_KPH);
const_assert!(KVB_V10_EMERGENCY_MARGIN_KPH <= KVB_EMERGENCY_MARGIN_KPH);
const_assert!(TVM_FALLBACK_RESET_KPH < TVM_FALLBACK_EMERGENCY_KPH);
