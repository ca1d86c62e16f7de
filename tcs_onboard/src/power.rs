//! Power module root.
//!
//! Circuit-breaker sequencing and the beacon-announced power zones that
//! restrict it.

pub mod breaker;
pub mod zones;
