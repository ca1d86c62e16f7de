//! Common library for the on-board train-protection workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Physical and regulatory constants
//! - [`config`] - Configuration loading traits and types
//! - [`host`] - Per-tick host input and command snapshots
//! - [`tcs`] - Subsystem states, emergency causes, indicators, messages, parameters
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod host;
pub mod prelude;
pub mod tcs;
