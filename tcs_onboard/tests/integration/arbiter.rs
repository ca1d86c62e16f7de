//! Integration test: emergency arbitration and consist relaying.
//!
//! Causes from independent subsystems are OR-ed into one brake command and
//! each clears only by its own rule. A leading unit drives a remote unit
//! through the inter-unit link, one tick of latency per message.

use tcs_common::consts::kph_to_mps;
use tcs_common::host::{HostInputs, SignalAspect, SignalObservation};
use tcs_common::tcs::config::TcsConfig;
use tcs_common::tcs::error::EmergencyCause;
use tcs_common::tcs::indicator::{DriverMessage, TcsEvent};
use tcs_common::tcs::message::UnitMessage;
use tcs_common::tcs::state::{BreakerState, RsoState, UnitRole};

use tcs_onboard::config::LoadedConfig;
use tcs_onboard::cycle::OnboardTcs;

// ── Helpers ─────────────────────────────────────────────────────────

const DT: f64 = 0.1;

fn unit(edit: impl FnOnce(&mut TcsConfig)) -> OnboardTcs {
    let mut cfg = TcsConfig::default();
    cfg.breaker.closing_delay_s = 1.0;
    edit(&mut cfg);
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

/// Signals ahead of a train that has covered `travelled_m`.
fn track(inputs: &mut HostInputs, travelled_m: f64, signals: &[SignalObservation]) {
    inputs.signals.clear();
    for s in signals.iter().filter(|s| s.distance_m > travelled_m) {
        let mut ahead = s.clone();
        ahead.distance_m -= travelled_m;
        if inputs.signals.push(ahead).is_err() {
            break;
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn causes_or_and_clear_independently() {
    let mut tcs = unit(|c| c.general.kvb = false);
    let line = [
        SignalObservation::new(3.0, SignalAspect::Approach1),
        SignalObservation::new(2000.0, SignalAspect::Clear1),
    ];

    let mut inputs = at(50.0);
    let mut travelled = 0.0;
    let mut first_message = None;
    for _ in 0..60 {
        track(&mut inputs, travelled, &line);
        let cmd = tcs.update(&inputs);
        if cmd.has_event(TcsEvent::EmergencyBrakeApplied) {
            first_message = cmd.message;
        }
        travelled += inputs.distance_m;
    }
    assert_eq!(tcs.causes(), EmergencyCause::RSO | EmergencyCause::VACMA);
    assert_eq!(first_message, Some(DriverMessage::RsoEmergency));
    assert_eq!(tcs.stats().emergency_applications, 1);

    // Rearm at speed: RSO releases, VACMA holds the brake.
    inputs.controls.rearm = true;
    track(&mut inputs, travelled, &line);
    let cmd = tcs.update(&inputs);
    assert!(cmd.emergency_brake);
    assert_eq!(tcs.causes(), EmergencyCause::VACMA);
    assert_eq!(tcs.rso().map(|r| r.state()), Some(RsoState::TriggeredFixed));
    assert!(!cmd.has_event(TcsEvent::EmergencyBrakeReleased));
}

#[test]
fn acknowledged_rso_never_brakes() {
    let mut tcs = unit(|c| {
        c.general.kvb = false;
        c.general.vacma = false;
    });
    let line = [
        SignalObservation::new(3.0, SignalAspect::Approach2),
        SignalObservation::new(2000.0, SignalAspect::Clear1),
    ];
    let mut inputs = at(50.0);
    let mut travelled = 0.0;
    for k in 0..100 {
        inputs.controls.rso_acknowledge = k == 10;
        track(&mut inputs, travelled, &line);
        let cmd = tcs.update(&inputs);
        assert!(!cmd.emergency_brake);
        travelled += inputs.distance_m;
    }
    assert_eq!(tcs.rso().map(|r| r.state()), Some(RsoState::TriggeredFixed));
}

#[test]
fn leader_drives_follower() {
    let mut leader = unit(|_| {});
    let mut follower = unit(|c| {
        c.general.role = UnitRole::Follower;
        c.general.vacma = false;
    });
    assert_eq!(follower.role(), UnitRole::Follower);

    let mut leader_inputs = at(0.0);
    let mut link = None;
    let mut tick = |leader_inputs: &HostInputs, link: &mut Option<UnitMessage>| {
        let mut follower_inputs = HostInputs {
            inbound: link.take(),
            ..leader_inputs.clone()
        };
        follower_inputs.controls = Default::default();
        follower_inputs.power.driver_closing_order = false;
        let lead = leader.update(leader_inputs);
        let follow = follower.update(&follower_inputs);
        *link = lead.outbound;
        (lead, follow)
    };

    // Driver closes the leader breaker; the follower follows one tick later.
    leader_inputs.power.driver_closing_order = true;
    for _ in 0..15 {
        tick(&leader_inputs, &mut link);
    }
    leader_inputs.power.driver_closing_order = false;
    let (lead, follow) = tick(&leader_inputs, &mut link);
    assert_eq!(lead.breaker_state, BreakerState::Closed);
    assert_eq!(follow.breaker_state, BreakerState::Closed);

    // Leader vigilance timeout brakes the whole consist.
    leader_inputs = HostInputs {
        power: leader_inputs.power,
        ..at(50.0)
    };
    let mut follower_braked = false;
    for _ in 0..70 {
        let (_, follow) = tick(&leader_inputs, &mut link);
        follower_braked |= follow.emergency_brake;
    }
    assert!(follower_braked);
    assert!(follower.causes().contains(EmergencyCause::LEADER));
    assert!(!follower.causes().contains(EmergencyCause::VACMA));
}

#[test]
fn leader_ignores_inbound_orders() {
    let mut leader = unit(|_| {});
    let mut inputs = at(0.0);
    inputs.inbound = Some(UnitMessage::EmergencyBrake(true));
    let cmd = leader.update(&inputs);
    assert!(!cmd.emergency_brake);
    assert!(leader.causes().is_empty());
}

#[test]
fn pantograph_zone_lowers_and_restores() {
    let mut tcs = unit(|c| {
        c.general.kvb = false;
        c.general.rso = false;
    });
    let line = [
        SignalObservation::new(0.5, SignalAspect::Clear1).with_tag("ZONE:PANTO:50:100"),
        SignalObservation::new(5000.0, SignalAspect::Clear1),
    ];
    let mut inputs = at(36.0);
    inputs.controls.vacma_pressed = true;

    let mut travelled = 0.0;
    let mut lowered_at = None;
    let mut raised_at = None;
    let mut relayed = Vec::new();
    for _ in 0..250 {
        track(&mut inputs, travelled, &line);
        let cmd = tcs.update(&inputs);
        travelled += inputs.distance_m;
        if cmd.pantograph_lowering_order && lowered_at.is_none() {
            lowered_at = Some(travelled);
        }
        if !cmd.pantograph_lowering_order && lowered_at.is_some() && raised_at.is_none() {
            raised_at = Some(travelled);
        }
        if let Some(m) = cmd.outbound {
            relayed.push(m);
        }
    }

    let lowered = lowered_at.expect("pantograph never lowered");
    let raised = raised_at.expect("pantograph never raised");
    assert!((lowered - 51.0).abs() < 3.0, "lowered at {lowered} m");
    assert!((raised - 151.0).abs() < 3.0, "raised at {raised} m");
    assert_eq!(
        relayed,
        vec![UnitMessage::PantographOrder(false), UnitMessage::PantographOrder(true)]
    );
    assert_eq!(tcs.zones().active_count(), 0);
}
