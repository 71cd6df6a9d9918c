//! CPU status register (P) flags.
//!
//! ```text
//! 7  6  5  4  3  2  1  0
//! N  V  U  B  D  I  Z  C
//! │  │  │  │  │  │  │  └─ Carry
//! │  │  │  │  │  │  └──── Zero
//! │  │  │  │  │  └─────── Interrupt Disable
//! │  │  │  │  └────────── Decimal (latches but has no effect on the 2A03)
//! │  │  │  └───────────── Break (1 when pushed by PHP/BRK, 0 by IRQ/NMI)
//! │  │  └──────────────── Unused (always 1 in the memory image)
//! │  └─────────────────── Overflow
//! └────────────────────── Negative
//! ```

use bitflags::bitflags;

bitflags! {
    /// CPU status register flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        /// Carry.
        const C = 1 << 0;
        /// Zero.
        const Z = 1 << 1;
        /// Interrupt disable.
        const I = 1 << 2;
        /// Decimal mode (no BCD on the 2A03, the bit still latches).
        const D = 1 << 3;
        /// Break. Only meaningful in the pushed stack image.
        const B = 1 << 4;
        /// Unused, reads back as 1.
        const U = 1 << 5;
        /// Signed overflow.
        const V = 1 << 6;
        /// Negative (bit 7 of the result).
        const N = 1 << 7;
    }
}

impl Status {
    /// Register state after reset: I and U set.
    pub const RESET: Self = Self::I.union(Self::U);

    /// Set or clear the Zero and Negative flags from a result byte.
    #[inline]
    pub fn set_zn(&mut self, value: u8) {
        self.set(Self::Z, value == 0);
        self.set(Self::N, value & 0x80 != 0);
    }

    /// Byte image for pushing to the stack. U is always set; B reflects
    /// whether the push came from software (PHP/BRK) or an interrupt.
    #[inline]
    #[must_use]
    pub const fn to_stack(self, brk: bool) -> u8 {
        let mut bits = self.bits() | Self::U.bits();
        if brk {
            bits |= Self::B.bits();
        }
        bits
    }

    /// Rebuild the register from a byte pulled off the stack. B is
    /// discarded, U forced on.
    #[inline]
    #[must_use]
    pub fn from_stack(value: u8) -> Self {
        Self::from_bits_retain((value & !Self::B.bits()) | Self::U.bits())
    }
}
