//! Integration test: invariants checked over input sweeps.
//!
//! - Every TVM triplet decodes, unknown ones to the restrictive fallback.
//! - A KVB emergency never releases while moving, however long it is fed
//!   quiet inputs.
//! - Exactly one VACMA pair runs above the activation speed.
//! - The braking curve grows with distance and shrinks with delay.

use tcs_common::consts::{TVM_FALLBACK_EMERGENCY_KPH, kph_to_mps};
use tcs_common::host::{SignalAspect, SignalObservation};
use tcs_common::tcs::config::{KvbConfig, VacmaConfig};
use tcs_common::tcs::state::{KvbState, TvmKind, VacmaPair};

use tcs_onboard::curve::speed_curve;
use tcs_onboard::safety::kvb::{Kvb, KvbInputs};
use tcs_onboard::safety::tvm::table::{TvmCode, TvmEntry, TvmSpeed, TvmTable};
use tcs_onboard::safety::vacma::{Vacma, VacmaInputs};

// ── Helpers ─────────────────────────────────────────────────────────

const CODES: [&str; 15] = [
    "RRR", "000", "030", "060", "080", "100", "130", "160", "170", "200", "220", "230", "270",
    "300", "320",
];

fn speeds() -> impl Iterator<Item = TvmSpeed> {
    CODES.iter().filter_map(|c| TvmSpeed::from_code(c))
}

/// Small deterministic generator for input sweeps.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next() % 100 < percent
    }
}

// ── TVM decoding ────────────────────────────────────────────────────

#[test]
fn every_triplet_decodes() {
    assert_eq!(speeds().count(), CODES.len());
    for kind in [TvmKind::Tvm300, TvmKind::Tvm430] {
        let table = TvmTable::builtin(kind);
        for ve in speeds() {
            for vc in speeds() {
                for va in speeds() {
                    let code = TvmCode::new(ve, vc, va);
                    let entry = table.lookup(&code);
                    if table.contains(&code) {
                        assert!(!entry.fallback);
                        assert_eq!(entry.code, code);
                        assert_eq!(entry.aspect, va);
                    } else {
                        assert_eq!(entry, TvmEntry::FALLBACK, "{kind:?} {code}");
                    }
                    assert!(entry.emergency_ve_kph >= TVM_FALLBACK_EMERGENCY_KPH);
                }
            }
        }
    }
}

#[test]
fn malformed_text_decodes_to_fallback() {
    let table = TvmTable::builtin(TvmKind::Tvm430);
    for text in ["", "300", "300/300", "300/300/300/300", "310/300/300", "abc/def/ghi"] {
        assert_eq!(table.decode(text), TvmEntry::FALLBACK, "{text:?}");
    }
    assert!(!table.decode(" 300 / 300 / 270 ").fallback);
}

#[test]
fn builtin_table_sizes() {
    assert_eq!(TvmTable::builtin(TvmKind::Tvm300).len(), 21);
    assert_eq!(TvmTable::builtin(TvmKind::Tvm430).len(), 38);
    assert!(TvmTable::builtin(TvmKind::None).is_empty());
}

// ── KVB latch ───────────────────────────────────────────────────────

#[test]
fn kvb_emergency_holds_while_moving() {
    let mut kvb = Kvb::new(&KvbConfig::default());
    let stop = SignalObservation::new(0.0, SignalAspect::Stop);
    kvb.update(&KvbInputs {
        speed_mps: kph_to_mps(40.0),
        line_speed_mps: kph_to_mps(160.0),
        passed: Some(&stop),
        ..Default::default()
    });
    assert!(kvb.emergency_braking());

    let mut rng = Lcg(7);
    for _ in 0..500 {
        let kph = 1.0 + (rng.next() % 150) as f64;
        let speed = kph_to_mps(kph);
        kvb.update(&KvbInputs {
            speed_mps: speed,
            line_speed_mps: kph_to_mps(160.0),
            distance_m: speed * 0.1,
            rearm: rng.chance(50),
            ..Default::default()
        });
        assert!(kvb.emergency_braking(), "released at {kph} km/h");
        assert_eq!(kvb.state(), KvbState::Emergency);
    }
}

// ── VACMA pairs ─────────────────────────────────────────────────────

#[test]
fn vacma_runs_one_pair_matching_pedal() {
    let mut vacma = Vacma::new(&VacmaConfig::default());
    let mut rng = Lcg(42);
    let mut pressed = false;
    for _ in 0..5000 {
        if rng.chance(2) {
            pressed = !pressed;
        }
        let inputs = VacmaInputs {
            speed_mps: kph_to_mps(100.0),
            pressed,
            activity: rng.chance(1),
            rearm: false,
        };
        vacma.update(&inputs, 0.1);
        if vacma.emergency_braking() {
            break;
        }
        let expected = if pressed {
            VacmaPair::Pressed
        } else {
            VacmaPair::Released
        };
        assert_eq!(vacma.pair(), expected);
    }
}

#[test]
fn vacma_idle_below_activation() {
    let mut vacma = Vacma::new(&VacmaConfig::default());
    for pressed in [true, false, true] {
        for _ in 0..100 {
            vacma.update(
                &VacmaInputs {
                    speed_mps: kph_to_mps(1.0),
                    pressed,
                    ..Default::default()
                },
                0.1,
            );
            assert_eq!(vacma.pair(), VacmaPair::Idle);
            assert!(!vacma.alert());
        }
    }
}

// ── Braking curve ───────────────────────────────────────────────────

#[test]
fn curve_monotonic_in_distance_and_delay() {
    for decl in [-0.01, 0.0, 0.005] {
        for target in [0.0, 8.3, 27.8] {
            let mut previous = target;
            for step in 1..=200 {
                let d = step as f64 * 25.0;
                let v = speed_curve(d, target, decl, 5.2, 0.7);
                assert!(v >= previous - 1e-12, "d={d} decl={decl}");
                assert!(v >= target);
                assert!(speed_curve(d, target, decl, 10.2, 0.7) <= v + 1e-12);
                previous = v;
            }
        }
    }
}

#[test]
fn curve_flat_without_braking_effort() {
    // Steep downhill cancels the deceleration entirely.
    assert_eq!(speed_curve(1000.0, 10.0, 0.1, 5.0, 0.7), 10.0);
}
