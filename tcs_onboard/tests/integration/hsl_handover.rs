//! Integration test: handover between TVM and KVB when leaving a high-speed
//! line.
//!
//! The TVM disarms as soon as the line speed falls to 220 km/h or a
//! `TVM_DISARM` beacon is passed, while the KVB stays in high-speed mode for
//! its 450 m exit distance. The arming check must not brake during that
//! handover, but still catches a TVM disarmed on the line itself.

use tcs_common::consts::kph_to_mps;
use tcs_common::host::{HostInputs, SignalAspect, SignalObservation};
use tcs_common::tcs::config::TcsConfig;
use tcs_common::tcs::error::{EmergencyCause, KvbEmergency};
use tcs_common::tcs::state::{KvbMode, TvmKind};

use tcs_onboard::config::LoadedConfig;
use tcs_onboard::cycle::OnboardTcs;

// ── Helpers ─────────────────────────────────────────────────────────

const DT: f64 = 0.1;
const SPEED_KPH: f64 = 150.0;

fn tvm430_unit() -> OnboardTcs {
    let mut cfg = TcsConfig::default();
    cfg.general.tvm = TvmKind::Tvm430;
    cfg.general.rso = false;
    cfg.general.vacma = false;
    cfg.kvb.train_speed_limit_kph = 320.0;
    OnboardTcs::new(&LoadedConfig::from_config(cfg).unwrap())
}

fn marker(position_m: f64, code: &str) -> SignalObservation {
    SignalObservation::new(position_m, SignalAspect::Unknown).with_tag(&format!("TVM:{code}"))
}

fn disarm_beacon(position_m: f64) -> SignalObservation {
    SignalObservation::new(position_m, SignalAspect::Unknown).with_tag("TVM_DISARM")
}

/// First emergency seen while running `distance_m` at constant speed: the
/// position and the causes at that tick.
fn drive(
    tcs: &mut OnboardTcs,
    line: &[SignalObservation],
    hsl_end_m: f64,
    distance_m: f64,
) -> Option<(f64, EmergencyCause)> {
    let speed = kph_to_mps(SPEED_KPH);
    let mut travelled = 0.0;
    let mut first = None;
    while travelled < distance_m {
        let line_kph = if travelled < hsl_end_m { 300.0 } else { 160.0 };
        let mut inputs = HostInputs {
            elapsed_s: DT,
            speed_mps: speed,
            distance_m: speed * DT,
            train_length_m: 400.0,
            line_speed_limit_mps: kph_to_mps(line_kph),
            ..Default::default()
        };
        for s in line.iter().filter(|s| s.distance_m > travelled) {
            let mut ahead = s.clone();
            ahead.distance_m -= travelled;
            if inputs.signals.push(ahead).is_err() {
                break;
            }
        }
        let cmd = tcs.update(&inputs);
        if cmd.emergency_brake && first.is_none() {
            first = Some((travelled, tcs.causes()));
        }
        travelled += inputs.distance_m;
    }
    first
}

fn assert_handed_over(tcs: &OnboardTcs) {
    assert_eq!(tcs.kvb().map(|k| k.mode()), Some(KvbMode::ConventionalLine));
    assert_eq!(tcs.tvm().map(|t| t.is_armed()), Some(false));
    assert_eq!(tcs.stats().emergency_applications, 0);
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn line_speed_drop_hands_over_without_braking() {
    let mut tcs = tvm430_unit();
    let line = [
        marker(1500.0, "300/300/300"),
        marker(3000.0, "300/300/300"),
        SignalObservation::new(6000.0, SignalAspect::Clear1),
    ];

    assert_eq!(drive(&mut tcs, &line, 3000.0, 3400.0), None);
    // Inside the exit distance: TVM off, KVB still in high-speed mode.
    assert_eq!(tcs.kvb().map(|k| k.mode()), Some(KvbMode::HighSpeedLine));
    assert_eq!(tcs.tvm().map(|t| t.is_armed()), Some(false));

    assert_eq!(drive(&mut tcs, &[], f64::NEG_INFINITY, 200.0), None);
    assert_handed_over(&tcs);
}

#[test]
fn disarm_beacon_before_line_speed_drop() {
    let mut tcs = tvm430_unit();
    let line = [
        marker(1500.0, "300/300/300"),
        disarm_beacon(2800.0),
        SignalObservation::new(6000.0, SignalAspect::Clear1),
    ];

    assert_eq!(drive(&mut tcs, &line, 3000.0, 4000.0), None);
    assert_handed_over(&tcs);
}

#[test]
fn tvm_disarmed_on_the_line_still_brakes() {
    let mut tcs = tvm430_unit();
    let line = [
        marker(1500.0, "300/300/300"),
        disarm_beacon(2000.0),
        marker(4500.0, "300/300/300"),
    ];

    let (at, causes) = drive(&mut tcs, &line, f64::INFINITY, 3000.0).expect("no braking");
    assert!((2440.0..2470.0).contains(&at), "braked at {at} m");
    assert_eq!(causes, EmergencyCause::KVB);
    assert!(
        tcs.kvb()
            .is_some_and(|k| k.conditions().contains(KvbEmergency::KARM))
    );
}
