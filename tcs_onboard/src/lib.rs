//! # On-board Train-Protection Supervisor
//!
//! Cyclic supervisor for one unit of a train running on the French network.
//! The host samples the simulation once per tick into a
//! [`tcs_common::host::HostInputs`] value; [`cycle::OnboardTcs::update`]
//! returns exactly one [`tcs_common::host::TcsCommands`] value.
//!
//! ## Subsystems
//!
//! 1. **Breaker**: circuit-breaker / traction-relay sequencing
//! 2. **RSO**: optical signal repetition and acknowledgement
//! 3. **KVB**: beacon speed control with braking curves
//! 4. **TVM300/430**: continuous cab signalling on high-speed lines
//! 5. **VACMA**: driver vigilance
//!
//! Each subsystem owns its emergency latch and clearing rule. The arbiter
//! only ORs them into the brake command.
//!
//! ## Determinism
//!
//! Nothing reads a clock: timers, blinkers and odometers advance by the
//! elapsed time and distance the host reports.

pub mod config;
pub mod curve;
pub mod cycle;
pub mod link;
pub mod power;
pub mod primitives;
pub mod safety;
pub mod scenario;
pub mod signal;
