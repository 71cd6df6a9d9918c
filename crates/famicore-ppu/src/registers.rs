//! PPUCTRL, PPUMASK and PPUSTATUS register bit definitions.

use bitflags::bitflags;

bitflags! {
    /// PPUCTRL ($2000), write-only.
    ///
    /// ```text
    /// 7  bit  0
    /// VPHB SINN
    /// |||| ||++- base nametable select
    /// |||| |+--- VRAM increment (0: +1, 1: +32)
    /// |||| +---- sprite pattern table (8x8 sprites only)
    /// |||+------ background pattern table
    /// ||+------- sprite size (0: 8x8, 1: 8x16)
    /// |+-------- master/slave (unused)
    /// +--------- NMI at vblank
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuCtrl: u8 {
        /// Nametable select X.
        const NAMETABLE_X = 0b0000_0001;
        /// Nametable select Y.
        const NAMETABLE_Y = 0b0000_0010;
        /// VRAM address increment per PPUDATA access.
        const INCREMENT_32 = 0b0000_0100;
        /// Sprite pattern table select (8x8 mode).
        const SPRITE_TABLE = 0b0000_1000;
        /// Background pattern table select.
        const BACKGROUND_TABLE = 0b0001_0000;
        /// 8x16 sprite mode.
        const SPRITE_16 = 0b0010_0000;
        /// Master/slave select (no effect).
        const MASTER_SLAVE = 0b0100_0000;
        /// Generate NMI at the start of vblank.
        const NMI_ENABLE = 0b1000_0000;
    }
}

impl PpuCtrl {
    /// VRAM address step for PPUDATA accesses.
    #[inline]
    #[must_use]
    pub fn vram_increment(self) -> u16 {
        if self.contains(Self::INCREMENT_32) {
            32
        } else {
            1
        }
    }

    /// Pattern table base for 8x8 sprites.
    #[inline]
    #[must_use]
    pub fn sprite_table(self) -> u16 {
        if self.contains(Self::SPRITE_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    /// Pattern table base for the background.
    #[inline]
    #[must_use]
    pub fn background_table(self) -> u16 {
        if self.contains(Self::BACKGROUND_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    /// Sprite height in pixels (8 or 16).
    #[inline]
    #[must_use]
    pub fn sprite_height(self) -> u16 {
        if self.contains(Self::SPRITE_16) {
            16
        } else {
            8
        }
    }

    /// NMI output enable.
    #[inline]
    #[must_use]
    pub fn nmi_enabled(self) -> bool {
        self.contains(Self::NMI_ENABLE)
    }
}

bitflags! {
    /// PPUMASK ($2001), write-only.
    ///
    /// ```text
    /// 7  bit  0
    /// BGRs bMmG
    /// |||| |||+- greyscale
    /// |||| ||+-- show background in the left 8 pixels
    /// |||| |+--- show sprites in the left 8 pixels
    /// |||| +---- background enable
    /// |||+------ sprite enable
    /// +++------- colour emphasis (B, G, R)
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuMask: u8 {
        /// Greyscale output.
        const GREYSCALE = 0b0000_0001;
        /// Show background in the leftmost 8 pixels.
        const BACKGROUND_LEFT = 0b0000_0010;
        /// Show sprites in the leftmost 8 pixels.
        const SPRITES_LEFT = 0b0000_0100;
        /// Background enable.
        const BACKGROUND = 0b0000_1000;
        /// Sprite enable.
        const SPRITES = 0b0001_0000;
        /// Red emphasis.
        const EMPHASIS_RED = 0b0010_0000;
        /// Green emphasis.
        const EMPHASIS_GREEN = 0b0100_0000;
        /// Blue emphasis.
        const EMPHASIS_BLUE = 0b1000_0000;
    }
}

impl PpuMask {
    /// Either layer is enabled.
    #[inline]
    #[must_use]
    pub fn rendering_enabled(self) -> bool {
        self.intersects(Self::BACKGROUND | Self::SPRITES)
    }

    /// The 3-bit emphasis field.
    #[inline]
    #[must_use]
    pub fn emphasis(self) -> u8 {
        self.bits() >> 5
    }
}

bitflags! {
    /// PPUSTATUS ($2002), read-only. The low five bits are open bus.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuStatus: u8 {
        /// More than eight sprites were found on a scanline.
        const SPRITE_OVERFLOW = 0b0010_0000;
        /// Sprite 0 overlapped an opaque background pixel.
        const SPRITE_ZERO_HIT = 0b0100_0000;
        /// Vertical blank.
        const VBLANK = 0b1000_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctrl_field_decoding() {
        assert_eq!(PpuCtrl::empty().vram_increment(), 1);
        assert_eq!(PpuCtrl::INCREMENT_32.vram_increment(), 32);
        assert_eq!(PpuCtrl::empty().sprite_height(), 8);
        assert_eq!(PpuCtrl::SPRITE_16.sprite_height(), 16);
        assert_eq!(PpuCtrl::BACKGROUND_TABLE.background_table(), 0x1000);
        assert_eq!(PpuCtrl::SPRITE_TABLE.sprite_table(), 0x1000);
    }

    #[test]
    fn test_mask_rendering_enabled() {
        assert!(!PpuMask::empty().rendering_enabled());
        assert!(PpuMask::BACKGROUND.rendering_enabled());
        assert!(PpuMask::SPRITES.rendering_enabled());
    }

    #[test]
    fn test_mask_emphasis_field() {
        let mask = PpuMask::EMPHASIS_RED | PpuMask::EMPHASIS_BLUE;
        assert_eq!(mask.emphasis(), 0b101);
    }
}
