//! Emergency-cause bitflags.
//!
//! The cycle arbiter ORs one flag per subsystem into a single brake
//! command. Flags are reported, never cleared, by the arbiter: each
//! subsystem owns its own latch and clearing rule.

use bitflags::bitflags;

bitflags! {
    /// Subsystems currently demanding emergency braking.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EmergencyCause: u8 {
        /// Unacknowledged closed signal.
        const RSO        = 0x01;
        /// KVB overspeed, SPAD or arming inconsistency.
        const KVB        = 0x02;
        /// TVM overspeed or closed-block passage.
        const TVM        = 0x04;
        /// Vigilance device timeout.
        const VACMA      = 0x08;
        /// Emergency braking relayed by the leading unit.
        const LEADER     = 0x10;
    }
}

impl Default for EmergencyCause {
    fn default() -> Self {
        Self::empty()
    }
}

impl EmergencyCause {
    /// Causes raised this tick that were not present on the previous tick.
    #[inline]
    pub const fn raised_since(self, previous: Self) -> Self {
        self.difference(previous)
    }
}

bitflags! {
    /// Individual KVB emergency conditions, OR-ed into `EmergencyCause::KVB`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KvbEmergency: u8 {
        /// Signal passed at danger.
        const SPAD       = 0x01;
        /// Overspeed against any supervised curve.
        const OVERSPEED  = 0x02;
        /// High-speed line without TVM armed.
        const KARM       = 0x04;
    }
}

impl Default for KvbEmergency {
    fn default() -> Self {
        Self::empty()
    }
}
