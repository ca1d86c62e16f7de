//! Safety subsystem root.
//!
//! One module per on-board protection function. Each subsystem owns its
//! own emergency latch and clearing rule; the cycle arbiter only reads them.

pub mod kvb;
pub mod rso;
pub mod tvm;
pub mod vacma;
