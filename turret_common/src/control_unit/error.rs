//! Interlock status bitflags.
//!
//! Flags marked CRITICAL halt actuation until an explicit RESET.

use bitflags::bitflags;

bitflags! {
    /// Safety interlock condition flags.
    ///
    /// CRITICAL flags (→ motion halted, fire OFF): ESTOP, COMM_STALE.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterlockFlags: u8 {
        /// Emergency stop latched. **CRITICAL**.
        const ESTOP          = 0x01;
        /// Command channel silent beyond the staleness threshold. **CRITICAL**.
        const COMM_STALE     = 0x02;
        /// Fire request suppressed by the no-fire zone this tick.
        const FIRE_INHIBITED = 0x04;
        /// Most recent explicit angle command was out of range.
        const RANGE_REJECTED = 0x08;
    }
}

impl InterlockFlags {
    /// Mask of all CRITICAL flags.
    pub const CRITICAL_MASK: Self =
        Self::from_bits_truncate(Self::ESTOP.bits() | Self::COMM_STALE.bits());

    /// Returns true if any CRITICAL flag is set.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }
}

impl Default for InterlockFlags {
    fn default() -> Self {
        Self::empty()
    }
}
