//! Integration test: KVB stop-target supervision.
//!
//! A 400 m train with standard brakes passes an Approach1 signal with the
//! stop signal 400 m ahead. The alert and emergency thresholds come from
//! the braking curves (alert curve anticipated by 5 s, both floored at the
//! V30 release speed) plus the normal margins.

use tcs_common::consts::{KVB_ALERT_ANTICIPATION_S, KVB_RELEASE_V30_KPH, kph_to_mps, mps_to_kph};
use tcs_common::host::{HostInputs, SignalAspect, SignalObservation};
use tcs_common::tcs::config::{KvbConfig, TcsConfig};
use tcs_common::tcs::error::{EmergencyCause, KvbEmergency};
use tcs_common::tcs::indicator::{DriverMessage, TcsEvent};
use tcs_common::tcs::state::KvbState;

use tcs_onboard::config::LoadedConfig;
use tcs_onboard::curve::speed_curve;
use tcs_onboard::cycle::OnboardTcs;
use tcs_onboard::safety::kvb::{BrakeKind, Kvb, KvbInputs, NORMAL_MARGINS, brake_delay_s};

// ── Helpers ─────────────────────────────────────────────────────────

const DT: f64 = 0.1;
const LENGTH_M: f64 = 400.0;
const STOP_M: f64 = 400.0;

/// `(alert, emergency)` trigger speeds [m/s] at `STOP_M` from the stop.
fn thresholds() -> (f64, f64) {
    let delay = brake_delay_s(BrakeKind::Standard, LENGTH_M);
    let decel = KvbConfig::default().safe_deceleration_mps2;
    let release = kph_to_mps(KVB_RELEASE_V30_KPH);
    let alert = speed_curve(STOP_M, 0.0, 0.0, delay + KVB_ALERT_ANTICIPATION_S, decel).max(release);
    let emergency = speed_curve(STOP_M, 0.0, 0.0, delay, decel).max(release);
    (
        alert + NORMAL_MARGINS.alert_mps,
        emergency + NORMAL_MARGINS.emergency_mps,
    )
}

/// One KVB tick passing the Approach1 signal at `kph`.
fn pass_approach(kph: f64) -> (Kvb, Option<KvbState>) {
    let mut kvb = Kvb::new(&KvbConfig::default());
    let approach = SignalObservation::new(0.0, SignalAspect::Approach1);
    let ahead = [SignalObservation::new(STOP_M, SignalAspect::Stop)];
    let speed = kph_to_mps(kph);
    let update = kvb.update(&KvbInputs {
        speed_mps: speed,
        train_length_m: LENGTH_M,
        line_speed_mps: kph_to_mps(160.0),
        distance_m: speed * DT,
        signals: &ahead,
        passed: Some(&approach),
        ..Default::default()
    });
    (kvb, update.state)
}

fn moving(kph: f64) -> HostInputs {
    HostInputs {
        elapsed_s: DT,
        speed_mps: kph_to_mps(kph),
        distance_m: kph_to_mps(kph) * DT,
        train_length_m: LENGTH_M,
        line_speed_limit_mps: kph_to_mps(160.0),
        ..Default::default()
    }
}

fn kvb_only() -> OnboardTcs {
    let mut cfg = TcsConfig::default();
    cfg.general.rso = false;
    cfg.general.vacma = false;
    OnboardTcs::new(&LoadedConfig::from_config(cfg).unwrap())
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn standard_brake_delay_for_400m() {
    assert!((brake_delay_s(BrakeKind::Standard, LENGTH_M) - 5.2).abs() < 1e-9);
}

#[test]
fn thresholds_sit_between_release_and_90kph() {
    let (alert, emergency) = thresholds();
    let (alert_kph, emergency_kph) = (mps_to_kph(alert), mps_to_kph(emergency));
    assert!(alert_kph > KVB_RELEASE_V30_KPH && alert_kph < emergency_kph);
    assert!((alert_kph - 68.3).abs() < 0.5, "alert at {alert_kph:.2} km/h");
    assert!((emergency_kph - 83.1).abs() < 0.5, "emergency at {emergency_kph:.2} km/h");
    assert!(emergency_kph < 90.0);
}

#[test]
fn below_alert_curve_stays_normal() {
    let (alert, _) = thresholds();
    let (kvb, state) = pass_approach(mps_to_kph(alert) - 0.5);
    assert_eq!(state, None);
    assert_eq!(kvb.state(), KvbState::Normal);
    assert_eq!(kvb.stop_target_m(), Some(STOP_M));
    assert!((kvb.brake_delay_s() - 5.2).abs() < 1e-9);
}

#[test]
fn between_curves_raises_alert_only() {
    let (alert, _) = thresholds();
    let (kvb, state) = pass_approach(mps_to_kph(alert) + 0.5);
    assert_eq!(state, Some(KvbState::Alert));
    assert!(!kvb.emergency_braking());
}

#[test]
fn above_emergency_curve_latches() {
    let (_, emergency) = thresholds();
    let (kvb, state) = pass_approach(mps_to_kph(emergency) + 0.5);
    assert_eq!(state, Some(KvbState::Emergency));
    assert!(kvb.emergency_braking());
    assert_eq!(kvb.conditions(), KvbEmergency::OVERSPEED);
}

#[test]
fn arbiter_brakes_train_at_90kph() {
    let mut tcs = kvb_only();

    let mut inputs = moving(90.0);
    inputs
        .signals
        .push(SignalObservation::new(5.0, SignalAspect::Approach1))
        .unwrap();
    inputs
        .signals
        .push(SignalObservation::new(5.0 + STOP_M, SignalAspect::Stop))
        .unwrap();
    let cmd = tcs.update(&inputs);
    assert!(!cmd.emergency_brake);

    // Approach1 drops out of the sample: passed.
    let travelled = inputs.distance_m;
    inputs.signals.clear();
    inputs
        .signals
        .push(SignalObservation::new(5.0 + STOP_M - travelled, SignalAspect::Stop))
        .unwrap();
    let cmd = tcs.update(&inputs);
    assert!(cmd.emergency_brake);
    assert!(!cmd.power_authorization);
    assert!(cmd.has_event(TcsEvent::KvbPenaltyChime));
    assert!(cmd.has_event(TcsEvent::EmergencyBrakeApplied));
    assert_eq!(cmd.message, Some(DriverMessage::KvbOverspeed));
    assert_eq!(cmd.next_speed_limit_mps, Some(0.0));
    assert_eq!(tcs.causes(), EmergencyCause::KVB);
}

#[test]
fn latch_survives_slowing_down_until_standstill() {
    let (_, emergency) = thresholds();
    let (mut kvb, _) = pass_approach(mps_to_kph(emergency) + 5.0);
    let ahead = [SignalObservation::new(STOP_M, SignalAspect::Stop)];

    let mut kph = 80.0;
    while kph > 0.0 {
        let speed = kph_to_mps(kph);
        kvb.update(&KvbInputs {
            speed_mps: speed,
            train_length_m: LENGTH_M,
            line_speed_mps: kph_to_mps(160.0),
            distance_m: speed * DT,
            signals: &ahead,
            rearm: true,
            ..Default::default()
        });
        assert!(kvb.emergency_braking(), "released at {kph} km/h");
        assert_eq!(kvb.state(), KvbState::Emergency);
        kph -= 10.0;
    }

    let stopped = KvbInputs {
        train_length_m: LENGTH_M,
        line_speed_mps: kph_to_mps(160.0),
        signals: &ahead,
        ..Default::default()
    };
    assert_eq!(kvb.update(&stopped).state, Some(KvbState::Normal));
    assert!(kvb.emergency_braking());
    let rearm = KvbInputs {
        rearm: true,
        ..stopped
    };
    assert!(kvb.update(&rearm).rearmed);
    assert!(kvb.on_sight());
}
