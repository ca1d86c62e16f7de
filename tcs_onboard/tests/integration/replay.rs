//! Integration test: replay of the sample config and scenario files.
//!
//! Loads `config/tcs.toml` with its TVM430 decoding table and drives each
//! file under `config/scenarios/` through the kinematic stub.

use std::path::PathBuf;

use tcs_common::tcs::error::EmergencyCause;
use tcs_common::tcs::indicator::{DriverMessage, TcsEvent};
use tcs_common::tcs::message::{BreakerOrder, UnitMessage};
use tcs_common::tcs::state::{BreakerState, TvmKind};

use tcs_onboard::config::{LoadedConfig, load_config};
use tcs_onboard::cycle::CycleStats;
use tcs_onboard::scenario::{Scenario, ScenarioRunner, TickRecord};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../config")
}

fn sample_config() -> LoadedConfig {
    load_config(&config_dir()).unwrap()
}

fn replay(name: &str) -> (Vec<TickRecord>, CycleStats) {
    let path = config_dir().join("scenarios").join(name);
    let scenario = Scenario::load(&path).unwrap();
    let mut runner = ScenarioRunner::new(scenario, &sample_config());
    let records = runner.run();
    assert!(runner.finished());
    (records, runner.stats().clone())
}

fn first_with(records: &[TickRecord], event: TcsEvent) -> Option<&TickRecord> {
    records.iter().find(|r| r.commands.has_event(event))
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn sample_config_loads_decoding_table() {
    let loaded = sample_config();
    assert_eq!(loaded.tcs.shared.service_name, "tgv-unit-1");
    assert_eq!(loaded.tcs.general.tvm, TvmKind::Tvm430);
    assert_eq!(loaded.tvm_table.len(), 38);
    assert!(!loaded.tvm_table.decode("300/270/270").fallback);
    assert!(loaded.tvm_table.decode("300/160/160").fallback);
}

#[test]
fn every_sample_scenario_parses() {
    let dir = config_dir().join("scenarios");
    let mut count = 0;
    for entry in std::fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|e| e == "toml") {
            Scenario::load(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
            count += 1;
        }
    }
    assert!(count >= 5);
}

#[test]
fn kvb_stop_brakes_short_of_signal_then_rearms() {
    let (records, stats) = replay("kvb_stop.toml");

    let applied = first_with(&records, TcsEvent::EmergencyBrakeApplied).expect("no braking");
    assert!(
        (299.0..310.0).contains(&applied.position_m),
        "braked at {} m",
        applied.position_m
    );
    assert_eq!(applied.commands.message, Some(DriverMessage::KvbOverspeed));
    assert!(applied.commands.has_event(TcsEvent::KvbPenaltyChime));

    let furthest = records.iter().map(|r| r.position_m).fold(0.0, f64::max);
    assert!(furthest < 700.0, "ran to {furthest} m");

    let rearmed = records
        .iter()
        .find(|r| r.commands.message == Some(DriverMessage::KvbRearmed))
        .expect("never rearmed");
    assert!(rearmed.time_s >= 40.0 - 1e-6);
    assert!(rearmed.commands.has_event(TcsEvent::EmergencyBrakeReleased));

    let last = records.last().unwrap();
    assert!(!last.commands.emergency_brake);
    assert_eq!(stats.cause_count(EmergencyCause::KVB), 1);
    assert_eq!(stats.cause_count(EmergencyCause::RSO), 0);
    assert_eq!(stats.emergency_applications, 1);
}

#[test]
fn vacma_release_alarm_then_brake() {
    let (records, stats) = replay("vacma_release.toml");

    let alert = first_with(&records, TcsEvent::VacmaAlertStart).expect("no alarm");
    assert!((2.4..=2.8).contains(&alert.time_s), "alarm at {} s", alert.time_s);
    let applied = first_with(&records, TcsEvent::EmergencyBrakeApplied).expect("no braking");
    assert!((4.9..=5.3).contains(&applied.time_s), "brake at {} s", applied.time_s);
    assert_eq!(applied.commands.message, Some(DriverMessage::VacmaEmergency));

    for r in records.iter().filter(|r| r.time_s >= applied.time_s) {
        assert!(r.commands.emergency_brake, "released at {} s", r.time_s);
    }
    assert_eq!(stats.cause_count(EmergencyCause::VACMA), 1);
    assert_eq!(stats.emergency_applications, 1);
}

#[test]
fn breaker_early_release_stays_open() {
    let (records, _) = replay("breaker_closing.toml");

    let count = |event| records.iter().filter(|r| r.commands.has_event(event)).count();
    assert_eq!(count(TcsEvent::BreakerClosing), 2);
    assert_eq!(count(TcsEvent::BreakerClosed), 1);
    assert_eq!(records.last().unwrap().commands.breaker_state, BreakerState::Open);

    let relayed: Vec<_> = records.iter().filter_map(|r| r.commands.outbound).collect();
    assert_eq!(
        relayed,
        vec![
            UnitMessage::BreakerOrder(BreakerOrder::Close),
            UnitMessage::BreakerOrder(BreakerOrder::Open),
            UnitMessage::BreakerOrder(BreakerOrder::Close),
            UnitMessage::BreakerOrder(BreakerOrder::Open),
        ]
    );
}

#[test]
fn tvm_overspeed_in_270_block() {
    let (records, stats) = replay("tvm_hsl.toml");

    assert!(records[0].commands.has_event(TcsEvent::TvmArmed));
    assert!(first_with(&records, TcsEvent::KvbModeChanged).is_some());

    let applied = first_with(&records, TcsEvent::EmergencyBrakeApplied).expect("no braking");
    assert!(applied.position_m > 4500.0, "braked at {} m", applied.position_m);
    assert_eq!(applied.commands.message, Some(DriverMessage::TvmOverspeed));
    assert!(stats.cause_count(EmergencyCause::TVM) >= 1);
    assert_eq!(stats.cause_count(EmergencyCause::KVB), 0);
    assert_eq!(stats.cause_count(EmergencyCause::VACMA), 0);
}

#[test]
fn tvm_hsl_exit_hands_over_without_braking() {
    let (records, stats) = replay("tvm_hsl_exit.toml");

    assert!(records[0].commands.has_event(TcsEvent::TvmArmed));
    let disarmed = first_with(&records, TcsEvent::TvmDisarmed).expect("never disarmed");
    assert!(
        (2790.0..2830.0).contains(&disarmed.position_m),
        "disarmed at {} m",
        disarmed.position_m
    );

    let modes: Vec<_> = records
        .iter()
        .filter(|r| r.commands.has_event(TcsEvent::KvbModeChanged))
        .map(|r| r.position_m)
        .collect();
    assert!(modes.len() >= 2, "mode changes at {modes:?}");
    let left = modes[modes.len() - 1];
    assert!((3400.0..3500.0).contains(&left), "left HSL at {left} m");

    assert!(records.iter().all(|r| !r.commands.emergency_brake));
    assert_eq!(stats.emergency_applications, 0);
}
