//! iNES / NES 2.0 ROM image parsing.
//!
//! The 16-byte header carries the magic `NES\x1A`, PRG/CHR sizes, mirroring
//! and battery flags, and the mapper id split across two (iNES) or three
//! (NES 2.0) nibbles. NES 2.0 is detected via `(byte 7 & 0x0C) == 0x08` and
//! adds size MSBs, RAM/NVRAM shift counts, and a timing byte.

use crate::Mirroring;

/// Errors raised while parsing a ROM image.
#[derive(Debug, thiserror::Error)]
pub enum RomError {
    /// Shorter than the 16-byte header.
    #[error("ROM image too small: {0} bytes")]
    FileTooSmall(usize),

    /// Header magic is not `NES\x1A`.
    #[error("invalid iNES magic: {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Header declares more PRG/CHR data than the file contains.
    #[error("ROM data truncated: header implies {expected} bytes, file has {actual}")]
    Truncated {
        /// Bytes the header requires.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// Header declares zero PRG-ROM banks.
    #[error("ROM declares no PRG-ROM")]
    NoPrgRom,

    /// Mapper id has no implementation in this crate.
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u16),
}

/// Parsed header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomHeader {
    /// PRG-ROM size in bytes (multiple of 16 KiB).
    pub prg_rom_size: usize,
    /// CHR-ROM size in bytes (multiple of 8 KiB); 0 means CHR-RAM.
    pub chr_rom_size: usize,
    /// PRG-RAM size in bytes.
    pub prg_ram_size: usize,
    /// Battery-backed PRG-NVRAM size in bytes (NES 2.0).
    pub prg_nvram_size: usize,
    /// CHR-RAM size in bytes (used when `chr_rom_size` is 0).
    pub chr_ram_size: usize,
    /// Mapper id (8-bit in iNES, 12-bit in NES 2.0).
    pub mapper_id: u16,
    /// Header-declared nametable mirroring.
    pub mirroring: Mirroring,
    /// Cartridge has battery-backed RAM.
    pub has_battery: bool,
    /// A 512-byte trainer precedes PRG-ROM.
    pub has_trainer: bool,
    /// Image uses the NES 2.0 extension.
    pub nes2: bool,
    /// CPU/PPU timing byte (NES 2.0; 0 = NTSC).
    pub timing: u8,
}

impl RomHeader {
    const MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];

    /// Parse the 16-byte header.
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < 16 {
            return Err(RomError::FileTooSmall(data.len()));
        }
        let magic = [data[0], data[1], data[2], data[3]];
        if magic != Self::MAGIC {
            return Err(RomError::InvalidMagic(magic));
        }

        let nes2 = (data[7] & 0x0C) == 0x08;

        let mut prg_banks = usize::from(data[4]);
        let mut chr_banks = usize::from(data[5]);
        let mut mapper_id = u16::from((data[6] >> 4) | (data[7] & 0xF0));

        let mirroring = if data[6] & 0x08 != 0 {
            Mirroring::FourScreen
        } else if data[6] & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        let has_battery = data[6] & 0x02 != 0;
        let has_trainer = data[6] & 0x04 != 0;

        let (prg_ram_size, prg_nvram_size, chr_ram_size, timing);
        if nes2 {
            mapper_id |= u16::from(data[8] & 0x0F) << 8;
            prg_banks |= usize::from(data[9] & 0x0F) << 8;
            chr_banks |= usize::from(data[9] >> 4) << 8;
            prg_ram_size = shift_size(data[10] & 0x0F);
            prg_nvram_size = shift_size(data[10] >> 4);
            chr_ram_size = if chr_banks == 0 {
                shift_size(data[11] & 0x0F)
            } else {
                0
            };
            timing = data[12] & 0x03;
        } else {
            // iNES: byte 8 is PRG-RAM banks, 0 meaning one 8 KiB bank.
            prg_ram_size = usize::from(data[8].max(1)) * 8192;
            prg_nvram_size = 0;
            chr_ram_size = if chr_banks == 0 { 8192 } else { 0 };
            timing = 0;
        }

        if prg_banks == 0 {
            return Err(RomError::NoPrgRom);
        }

        Ok(Self {
            prg_rom_size: prg_banks * 16384,
            chr_rom_size: chr_banks * 8192,
            prg_ram_size,
            prg_nvram_size,
            chr_ram_size,
            mapper_id,
            mirroring,
            has_battery,
            has_trainer,
            nes2,
            timing,
        })
    }
}

/// NES 2.0 RAM size field: 0 means none, otherwise `64 << shift` bytes.
fn shift_size(shift: u8) -> usize {
    if shift == 0 {
        0
    } else {
        64usize << shift
    }
}

/// A parsed ROM image: header plus the PRG/CHR payloads.
#[derive(Debug, Clone)]
pub struct Rom {
    /// Parsed header.
    pub header: RomHeader,
    /// Trainer payload, when present.
    pub trainer: Option<Vec<u8>>,
    /// PRG-ROM data. Immutable once loaded.
    pub prg_rom: Vec<u8>,
    /// CHR-ROM data; empty when the board uses CHR-RAM.
    pub chr_rom: Vec<u8>,
}

impl Rom {
    /// Parse a complete `.nes` image from memory.
    pub fn load(data: &[u8]) -> Result<Self, RomError> {
        let header = RomHeader::parse(data)?;
        let mut offset = 16;

        let trainer = if header.has_trainer {
            let end = offset + 512;
            if data.len() < end {
                return Err(RomError::Truncated {
                    expected: end,
                    actual: data.len(),
                });
            }
            let t = data[offset..end].to_vec();
            offset = end;
            Some(t)
        } else {
            None
        };

        let prg_end = offset + header.prg_rom_size;
        if data.len() < prg_end {
            return Err(RomError::Truncated {
                expected: prg_end,
                actual: data.len(),
            });
        }
        let prg_rom = data[offset..prg_end].to_vec();
        offset = prg_end;

        let chr_end = offset + header.chr_rom_size;
        if data.len() < chr_end {
            return Err(RomError::Truncated {
                expected: chr_end,
                actual: data.len(),
            });
        }
        let chr_rom = data[offset..chr_end].to_vec();

        if data.len() > chr_end {
            log::warn!(
                "ROM has {} trailing bytes past PRG+CHR; ignoring",
                data.len() - chr_end
            );
        }

        Ok(Self {
            header,
            trainer,
            prg_rom,
            chr_rom,
        })
    }

    /// CHR-RAM size this board should allocate (0 when CHR-ROM is present).
    #[must_use]
    pub fn chr_ram_size(&self) -> usize {
        if self.chr_rom.is_empty() {
            self.header.chr_ram_size.max(8192)
        } else {
            0
        }
    }

    /// PRG-RAM size to allocate, folding NVRAM in (the battery region is a
    /// normal mutable region to the core; persistence is the host's job).
    #[must_use]
    pub fn prg_ram_size(&self) -> usize {
        self.header.prg_ram_size.max(self.header.prg_nvram_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn build_header(prg_banks: u8, chr_banks: u8, mapper: u8, flags6: u8) -> Vec<u8> {
        let mut h = vec![0x4E, 0x45, 0x53, 0x1A];
        h.push(prg_banks);
        h.push(chr_banks);
        h.push(((mapper & 0x0F) << 4) | flags6);
        h.push(mapper & 0xF0);
        h.extend_from_slice(&[0; 8]);
        h
    }

    fn build_rom(prg_banks: u8, chr_banks: u8, mapper: u8, flags6: u8) -> Vec<u8> {
        let mut data = build_header(prg_banks, chr_banks, mapper, flags6);
        data.extend(std::iter::repeat(0xAA).take(usize::from(prg_banks) * 16384));
        data.extend(std::iter::repeat(0x55).take(usize::from(chr_banks) * 8192));
        data
    }

    #[test]
    fn test_parses_plain_ines() {
        let rom = Rom::load(&build_rom(2, 1, 0, 0x00)).unwrap();
        assert_eq!(rom.header.prg_rom_size, 32768);
        assert_eq!(rom.header.chr_rom_size, 8192);
        assert_eq!(rom.header.mapper_id, 0);
        assert_eq!(rom.header.mirroring, Mirroring::Horizontal);
        assert!(!rom.header.nes2);
        assert_eq!(rom.prg_rom[0], 0xAA);
        assert_eq!(rom.chr_rom[0], 0x55);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut data = build_rom(1, 1, 0, 0);
        data[0] = 0x4D;
        assert!(matches!(Rom::load(&data), Err(RomError::InvalidMagic(_))));
    }

    #[test]
    fn test_rejects_truncated_prg() {
        let mut data = build_header(2, 0, 0, 0);
        data.extend_from_slice(&[0; 1000]);
        assert!(matches!(Rom::load(&data), Err(RomError::Truncated { .. })));
    }

    #[test]
    fn test_rejects_zero_prg() {
        let data = build_header(0, 1, 0, 0);
        assert!(matches!(RomHeader::parse(&data), Err(RomError::NoPrgRom)));
    }

    #[test]
    fn test_mapper_id_from_both_nibbles() {
        let header = RomHeader::parse(&build_header(1, 1, 0x42, 0)).unwrap();
        assert_eq!(header.mapper_id, 0x42);
    }

    #[test]
    fn test_mirroring_flags() {
        assert_eq!(
            RomHeader::parse(&build_header(1, 1, 0, 0x01)).unwrap().mirroring,
            Mirroring::Vertical
        );
        assert_eq!(
            RomHeader::parse(&build_header(1, 1, 0, 0x08)).unwrap().mirroring,
            Mirroring::FourScreen
        );
    }

    #[test]
    fn test_trainer_is_carried() {
        let mut data = build_header(1, 0, 0, 0x04);
        data.extend_from_slice(&[0xFF; 512]);
        data.extend_from_slice(&[0; 16384]);
        let rom = Rom::load(&data).unwrap();
        assert_eq!(rom.trainer.as_ref().map(Vec::len), Some(512));
        assert_eq!(rom.prg_rom.len(), 16384);
    }

    #[test]
    fn test_nes2_extends_mapper_and_sizes() {
        let mut h = build_header(1, 0, 0x04, 0);
        h[7] |= 0x08; // NES 2.0 marker
        h[8] = 0x01; // mapper high nibble -> id 0x104
        h[10] = 0x07; // PRG-RAM 64 << 7 = 8 KiB
        h[11] = 0x07; // CHR-RAM 8 KiB
        let header = RomHeader::parse(&h).unwrap();
        assert!(header.nes2);
        assert_eq!(header.mapper_id, 0x104);
        assert_eq!(header.prg_ram_size, 8192);
        assert_eq!(header.chr_ram_size, 8192);
    }

    #[test]
    fn test_chr_ram_defaults_to_8k() {
        let rom = Rom::load(&build_rom(1, 0, 0, 0)).unwrap();
        assert_eq!(rom.chr_ram_size(), 8192);
        let rom = Rom::load(&build_rom(1, 1, 0, 0)).unwrap();
        assert_eq!(rom.chr_ram_size(), 0);
    }
}
