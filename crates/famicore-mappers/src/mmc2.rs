//! Mapper 9: MMC2 (PxROM, Punch-Out!!).
//!
//! 8 KiB switchable PRG bank at $8000 with the last three banks fixed, and
//! the signature CHR latch scheme: each pattern-table half has two bank
//! registers, selected by a latch that flips when the PPU fetches tile $FD
//! or $FE from that half. The flip happens as a side effect of `ppu_read`,
//! which is why that method takes `&mut self`.

use crate::{Mapper, Mirroring, Rom};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latch {
    Fd,
    Fe,
}

/// MMC2 board state.
pub struct Mmc2 {
    prg_rom: Vec<u8>,
    prg_ram: Vec<u8>,
    chr: Vec<u8>,
    chr_writable: bool,

    prg_bank: u8,
    chr_low_fd: u8,
    chr_low_fe: u8,
    chr_high_fd: u8,
    chr_high_fe: u8,
    latch_low: Latch,
    latch_high: Latch,

    mirroring: Mirroring,
}

impl Mmc2 {
    /// Build from a parsed ROM.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let chr_writable = rom.chr_rom.is_empty();
        let chr = if chr_writable {
            vec![0; rom.chr_ram_size()]
        } else {
            rom.chr_rom.clone()
        };
        Self {
            prg_rom: rom.prg_rom.clone(),
            prg_ram: vec![0; rom.prg_ram_size().max(8192)],
            chr,
            chr_writable,
            prg_bank: 0,
            chr_low_fd: 0,
            chr_low_fe: 0,
            chr_high_fd: 0,
            chr_high_fe: 0,
            latch_low: Latch::Fd,
            latch_high: Latch::Fd,
            mirroring: rom.header.mirroring,
        }
    }

    fn chr_bank(&self, addr: u16) -> u8 {
        if addr < 0x1000 {
            match self.latch_low {
                Latch::Fd => self.chr_low_fd,
                Latch::Fe => self.chr_low_fe,
            }
        } else {
            match self.latch_high {
                Latch::Fd => self.chr_high_fd,
                Latch::Fe => self.chr_high_fe,
            }
        }
    }
}

impl Mapper for Mmc2 {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                let mask = self.prg_ram.len() - 1;
                self.prg_ram[usize::from(addr - 0x6000) & mask]
            }
            // Switchable 8 KiB bank.
            0x8000..=0x9FFF => {
                let mask = (self.prg_rom.len() / 0x2000) - 1;
                let bank = usize::from(self.prg_bank) & mask;
                self.prg_rom[bank * 0x2000 + usize::from(addr & 0x1FFF)]
            }
            // Last three 8 KiB banks, fixed.
            0xA000..=0xFFFF => {
                let from_end = usize::from(0xFFFF - addr);
                self.prg_rom[self.prg_rom.len() - 1 - from_end]
            }
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => {
                let mask = self.prg_ram.len() - 1;
                self.prg_ram[usize::from(addr - 0x6000) & mask] = value;
            }
            0xA000..=0xAFFF => self.prg_bank = value & 0x0F,
            0xB000..=0xBFFF => self.chr_low_fd = value & 0x1F,
            0xC000..=0xCFFF => self.chr_low_fe = value & 0x1F,
            0xD000..=0xDFFF => self.chr_high_fd = value & 0x1F,
            0xE000..=0xEFFF => self.chr_high_fe = value & 0x1F,
            0xF000..=0xFFFF => {
                self.mirroring = if value & 0x01 != 0 {
                    Mirroring::Horizontal
                } else {
                    Mirroring::Vertical
                };
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        let bank = self.chr_bank(addr);
        let offset =
            (usize::from(bank) * 0x1000 + usize::from(addr & 0x0FFF)) & (self.chr.len() - 1);
        let data = self.chr[offset];

        // Latch updates take effect for the *next* fetch.
        match addr {
            0x0FD8 => self.latch_low = Latch::Fd,
            0x0FE8 => self.latch_low = Latch::Fe,
            0x1FD8..=0x1FDF => self.latch_high = Latch::Fd,
            0x1FE8..=0x1FEF => self.latch_high = Latch::Fe,
            _ => {}
        }

        data
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        if self.chr_writable {
            let bank = self.chr_bank(addr);
            let offset =
                (usize::from(bank) * 0x1000 + usize::from(addr & 0x0FFF)) & (self.chr.len() - 1);
            self.chr[offset] = value;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
        self.latch_low = Latch::Fd;
        self.latch_high = Latch::Fd;
    }

    fn id(&self) -> u16 {
        9
    }

    fn name(&self) -> &'static str {
        "MMC2"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::test_rom;

    fn board() -> Mmc2 {
        let mut rom = test_rom(8, 4, 9); // sixteen 8 KiB PRG banks, eight 4K CHR banks
        for bank in 0..16 {
            rom.prg_rom[bank * 0x2000] = bank as u8;
        }
        for bank in 0..8 {
            rom.chr_rom[bank * 0x1000] = 0x60 + bank as u8;
        }
        Mmc2::new(&rom)
    }

    #[test]
    fn test_last_three_banks_fixed() {
        let mut m = board();
        assert_eq!(m.cpu_read(0xA000), 13);
        assert_eq!(m.cpu_read(0xC000), 14);
        assert_eq!(m.cpu_read(0xE000), 15);
        m.cpu_write(0xA000, 5);
        assert_eq!(m.cpu_read(0x8000), 5);
        assert_eq!(m.cpu_read(0xE000), 15);
    }

    #[test]
    fn test_fd_fetch_flips_low_latch() {
        let mut m = board();
        m.cpu_write(0xB000, 1); // low FD bank
        m.cpu_write(0xC000, 2); // low FE bank

        // Latch starts at FD.
        assert_eq!(m.ppu_read(0x0000), 0x61);

        // Reading tile $FE's first byte ($0FE8) flips the latch to FE.
        m.ppu_read(0x0FE8);
        assert_eq!(m.ppu_read(0x0000), 0x62);

        // And $0FD8 flips it back.
        m.ppu_read(0x0FD8);
        assert_eq!(m.ppu_read(0x0000), 0x61);
    }

    #[test]
    fn test_high_latch_uses_address_ranges() {
        let mut m = board();
        m.cpu_write(0xD000, 3);
        m.cpu_write(0xE000, 4);
        assert_eq!(m.ppu_read(0x1000), 0x63);
        m.ppu_read(0x1FE8);
        assert_eq!(m.ppu_read(0x1000), 0x64);
    }

    #[test]
    fn test_mirroring_control() {
        let mut m = board();
        m.cpu_write(0xF000, 1);
        assert_eq!(m.mirroring(), Mirroring::Horizontal);
        m.cpu_write(0xF000, 0);
        assert_eq!(m.mirroring(), Mirroring::Vertical);
    }
}
