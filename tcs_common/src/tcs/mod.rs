//! On-board supervisor shared types.
//!
//! Organized by domain: state enums, emergency-cause bitflags, cab
//! indicators and events, inter-unit messages, and the parameter file
//! layout.

pub mod config;
pub mod error;
pub mod indicator;
pub mod message;
pub mod state;
