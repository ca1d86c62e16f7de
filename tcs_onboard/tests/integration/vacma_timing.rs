//! Integration test: vigilance timing through the arbiter.
//!
//! The pedal is released at 50 km/h: the alarm sounds after 2.5 s, the
//! brake is applied after 5 s and nothing releases it while the train is
//! above the activation speed.

use tcs_common::consts::kph_to_mps;
use tcs_common::host::HostInputs;
use tcs_common::tcs::config::TcsConfig;
use tcs_common::tcs::error::EmergencyCause;
use tcs_common::tcs::indicator::{DriverMessage, Indicator, TcsEvent};
use tcs_common::tcs::state::VacmaPair;

use tcs_onboard::config::LoadedConfig;
use tcs_onboard::cycle::OnboardTcs;

// ── Helpers ─────────────────────────────────────────────────────────

const DT: f64 = 0.1;

fn vacma_only() -> OnboardTcs {
    let mut cfg = TcsConfig::default();
    cfg.general.rso = false;
    cfg.general.kvb = false;
    OnboardTcs::new(&LoadedConfig::from_config(cfg).unwrap())
}

fn at(kph: f64) -> HostInputs {
    HostInputs {
        elapsed_s: DT,
        speed_mps: kph_to_mps(kph),
        distance_m: kph_to_mps(kph) * DT,
        train_length_m: 200.0,
        line_speed_limit_mps: kph_to_mps(160.0),
        ..Default::default()
    }
}

/// Time of the first tick carrying `event`, the release tick being t = 0.
fn first_event(tcs: &mut OnboardTcs, inputs: &HostInputs, event: TcsEvent, ticks: usize) -> Option<f64> {
    (0..ticks).find_map(|k| {
        let cmd = tcs.update(inputs);
        cmd.has_event(event).then_some(k as f64 * DT)
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn released_pedal_alert_then_emergency() {
    let mut tcs = vacma_only();
    let inputs = at(50.0);

    let mut alert_at = None;
    let mut brake_at = None;
    for k in 0..100 {
        let t = k as f64 * DT;
        let cmd = tcs.update(&inputs);
        if cmd.has_event(TcsEvent::VacmaAlertStart) && alert_at.is_none() {
            alert_at = Some(t);
            assert_eq!(cmd.indicator(Indicator::VacmaAlert), Some(1));
            assert!(!cmd.emergency_brake);
        }
        if cmd.has_event(TcsEvent::EmergencyBrakeApplied) {
            brake_at = Some(t);
            assert_eq!(cmd.message, Some(DriverMessage::VacmaEmergency));
        }
    }

    let alert_at = alert_at.expect("alarm never sounded");
    let brake_at = brake_at.expect("brake never applied");
    assert!((alert_at - 2.5).abs() <= DT + 1e-9, "alarm at {alert_at}");
    assert!((brake_at - 5.0).abs() <= DT + 1e-9, "brake at {brake_at}");
    assert_eq!(tcs.causes(), EmergencyCause::VACMA);
}

#[test]
fn emergency_held_while_above_activation_speed() {
    let mut tcs = vacma_only();
    let mut inputs = at(50.0);
    assert!(first_event(&mut tcs, &inputs, TcsEvent::EmergencyBrakeApplied, 80).is_some());

    // Pedal, horn and rearm at speed change nothing.
    inputs.controls.vacma_pressed = true;
    inputs.controls.horn = true;
    inputs.controls.rearm = true;
    for kph in [50.0, 30.0, 10.0, 4.0] {
        let cmd = tcs.update(&at_with(kph, &inputs));
        assert!(cmd.emergency_brake, "released at {kph} km/h");
    }

    // Below activation speed without rearm: still latched.
    inputs.controls.rearm = false;
    assert!(tcs.update(&at_with(2.0, &inputs)).emergency_brake);

    inputs.controls.rearm = true;
    let cmd = tcs.update(&at_with(2.0, &inputs));
    assert!(!cmd.emergency_brake);
    assert!(cmd.has_event(TcsEvent::EmergencyBrakeReleased));
}

fn at_with(kph: f64, template: &HostInputs) -> HostInputs {
    HostInputs {
        controls: template.controls,
        ..at(kph)
    }
}

#[test]
fn switching_pairs_restarts_timing() {
    let mut tcs = vacma_only();
    let mut inputs = at(80.0);

    // 2 s released, just short of the alarm.
    for _ in 0..20 {
        assert!(!tcs.update(&inputs).has_event(TcsEvent::VacmaAlertStart));
    }
    inputs.controls.vacma_pressed = true;
    tcs.update(&inputs);
    assert_eq!(tcs.vacma().map(|v| v.pair()), Some(VacmaPair::Pressed));

    // Released again: a fresh 2.5 s before the alarm.
    inputs.controls.vacma_pressed = false;
    let alert = first_event(&mut tcs, &inputs, TcsEvent::VacmaAlertStart, 40).expect("no alarm");
    assert!(alert > 2.0, "alarm after {alert} s");
}

#[test]
fn throttle_movement_restarts_running_pair() {
    let mut tcs = vacma_only();
    let mut inputs = at(80.0);
    inputs.controls.throttle_percent = 40.0;

    // Move the throttle every 2 s: the alarm never sounds.
    for k in 0..200 {
        if k % 20 == 0 {
            inputs.controls.throttle_percent = 100.0 - inputs.controls.throttle_percent;
        }
        let cmd = tcs.update(&inputs);
        assert!(!cmd.has_event(TcsEvent::VacmaAlertStart), "alarm at tick {k}");
        assert!(!cmd.emergency_brake);
    }
}

#[test]
fn idle_below_activation_speed() {
    let mut tcs = vacma_only();
    let inputs = at(2.0);
    for _ in 0..100 {
        assert!(!tcs.update(&inputs).emergency_brake);
    }
    assert_eq!(tcs.vacma().map(|v| v.pair()), Some(VacmaPair::Idle));
}
