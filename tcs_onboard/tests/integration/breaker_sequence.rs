//! Integration test: breaker closing sequence.
//!
//! Closing needs the order held with authorisation for the whole closing
//! delay. An order released one tick early leaves the breaker open, and
//! the leading unit relays every settled position to the consist.

use tcs_common::host::HostInputs;
use tcs_common::tcs::config::TcsConfig;
use tcs_common::tcs::indicator::{Indicator, TcsEvent};
use tcs_common::tcs::message::{BreakerOrder, UnitMessage};
use tcs_common::tcs::state::{BreakerState, PowerSupplyKind};

use tcs_onboard::config::LoadedConfig;
use tcs_onboard::cycle::OnboardTcs;

// ── Helpers ─────────────────────────────────────────────────────────

const DT: f64 = 0.1;
const DELAY_S: f64 = 2.0;

fn unit(power_supply: PowerSupplyKind) -> OnboardTcs {
    let mut cfg = TcsConfig::default();
    cfg.breaker.closing_delay_s = DELAY_S;
    cfg.general.power_supply = power_supply;
    OnboardTcs::new(&LoadedConfig::from_config(cfg).unwrap())
}

fn standstill() -> HostInputs {
    HostInputs {
        elapsed_s: DT,
        train_length_m: 200.0,
        ..Default::default()
    }
}

fn ticks_for_delay() -> usize {
    (DELAY_S / DT).round() as usize
}

/// Hold the closing order until the breaker is closed, then release it.
fn close(tcs: &mut OnboardTcs, inputs: &mut HostInputs) {
    inputs.power.driver_closing_order = true;
    for _ in 0..=ticks_for_delay() + 1 {
        tcs.update(inputs);
    }
    inputs.power.driver_closing_order = false;
    tcs.update(inputs);
    assert_eq!(tcs.breaker().state(), BreakerState::Closed);
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn early_release_leaves_breaker_open() {
    let mut tcs = unit(PowerSupplyKind::Electric);
    let mut inputs = standstill();
    close(&mut tcs, &mut inputs);

    // Driver opens, withdraws authorisation, then restores it.
    inputs.power.driver_opening_order = true;
    let cmd = tcs.update(&inputs);
    assert_eq!(cmd.breaker_state, BreakerState::Open);
    assert!(cmd.has_event(TcsEvent::BreakerOpened));
    inputs.power.driver_opening_order = false;
    inputs.power.driver_closing_authorization = false;
    for _ in 0..5 {
        assert!(!tcs.update(&inputs).breaker_closing_authorization);
    }
    inputs.power.driver_closing_authorization = true;

    // Order held for the delay minus one tick.
    inputs.power.driver_closing_order = true;
    for k in 0..ticks_for_delay() - 1 {
        let cmd = tcs.update(&inputs);
        assert_eq!(cmd.breaker_state, BreakerState::Closing, "tick {k}");
    }
    inputs.power.driver_closing_order = false;
    let cmd = tcs.update(&inputs);
    assert_eq!(cmd.breaker_state, BreakerState::Open);
    assert!(cmd.has_event(TcsEvent::BreakerOpened));

    for _ in 0..50 {
        let cmd = tcs.update(&inputs);
        assert_eq!(cmd.breaker_state, BreakerState::Open);
        assert_eq!(cmd.indicator(Indicator::Breaker), Some(BreakerState::Open as i32));
    }
}

#[test]
fn full_delay_closes_once() {
    let mut tcs = unit(PowerSupplyKind::Electric);
    let mut inputs = standstill();
    inputs.power.driver_closing_order = true;

    let mut closed_events = 0;
    for _ in 0..(3 * ticks_for_delay()) {
        if tcs.update(&inputs).has_event(TcsEvent::BreakerClosed) {
            closed_events += 1;
        }
    }
    assert_eq!(closed_events, 1);
    assert!(tcs.breaker().is_closed());
}

#[test]
fn leader_relays_closing_and_abort() {
    let mut tcs = unit(PowerSupplyKind::Electric);
    let mut inputs = standstill();

    inputs.power.driver_closing_order = true;
    let cmd = tcs.update(&inputs);
    assert_eq!(cmd.outbound, Some(UnitMessage::BreakerOrder(BreakerOrder::Close)));
    for _ in 0..5 {
        assert_eq!(tcs.update(&inputs).outbound, None);
    }

    inputs.power.driver_closing_order = false;
    let cmd = tcs.update(&inputs);
    assert_eq!(cmd.breaker_state, BreakerState::Open);
    assert_eq!(cmd.outbound, Some(UnitMessage::BreakerOrder(BreakerOrder::Open)));
}

#[test]
fn power_source_gates_authorization() {
    let mut electric = unit(PowerSupplyKind::Electric);
    let mut inputs = standstill();
    inputs.power.pantograph_up = false;
    inputs.power.driver_closing_order = true;
    let cmd = electric.update(&inputs);
    assert!(!cmd.breaker_closing_authorization);
    assert_eq!(cmd.breaker_state, BreakerState::Open);

    let mut dual = unit(PowerSupplyKind::DualMode);
    inputs.power.diesel_engine_running = true;
    let cmd = dual.update(&inputs);
    assert!(cmd.breaker_closing_authorization);
    assert_eq!(cmd.breaker_state, BreakerState::Closing);
}

#[test]
fn authorization_loss_opens_unless_retained() {
    let mut tcs = unit(PowerSupplyKind::Electric);
    let mut inputs = standstill();
    close(&mut tcs, &mut inputs);

    inputs.power.service_retention = true;
    inputs.power.pantograph_up = false;
    assert_eq!(tcs.update(&inputs).breaker_state, BreakerState::Closed);

    inputs.power.service_retention = false;
    assert_eq!(tcs.update(&inputs).breaker_state, BreakerState::Open);
}
