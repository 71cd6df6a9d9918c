//! NES cartridge ROM loading and mapper implementations.
//!
//! A cartridge is a parsed [`Rom`] image plus a boxed [`Mapper`] that
//! translates CPU and PPU addresses into the installed ROM/RAM regions and
//! owns the nametable mirroring mode.
//!
//! # Supported mappers
//!
//! | Id | Name       | Banking                                    |
//! |----|------------|--------------------------------------------|
//! | 0  | NROM       | none                                       |
//! | 1  | MMC1       | serial-loaded PRG/CHR banks, mirroring     |
//! | 2  | UxROM      | 16 KiB PRG banks, last fixed               |
//! | 3  | CNROM      | 8 KiB CHR banks                            |
//! | 4  | MMC3       | 8 KiB PRG / 1 KiB CHR banks, scanline IRQ  |
//! | 7  | AxROM      | 32 KiB PRG banks, single-screen select     |
//! | 9  | MMC2       | 8 KiB PRG, FD/FE CHR latches               |
//! | 79 | NINA-03/06 | 32 KiB PRG + 8 KiB CHR register            |
//!
//! # Example
//!
//! ```no_run
//! use famicore_mappers::{create_mapper, Rom};
//!
//! let data = std::fs::read("game.nes").expect("read ROM");
//! let rom = Rom::load(&data).expect("parse ROM");
//! let mut mapper = create_mapper(&rom).expect("supported mapper");
//! let reset_lo = mapper.cpu_read(0xFFFC);
//! ```

pub mod mapper;
pub mod rom;

mod axrom;
mod cnrom;
mod colordreams;
mod mmc1;
mod mmc2;
mod mmc3;
mod nrom;
mod uxrom;

pub use axrom::Axrom;
pub use cnrom::Cnrom;
pub use colordreams::ColorDreams;
pub use mapper::{Mapper, Mirroring};
pub use mmc1::Mmc1;
pub use mmc2::Mmc2;
pub use mmc3::Mmc3;
pub use nrom::Nrom;
pub use rom::{Rom, RomError, RomHeader};
pub use uxrom::Uxrom;

/// Instantiate the mapper a ROM's header asks for.
///
/// # Errors
///
/// `RomError::UnsupportedMapper` when the id has no implementation here.
pub fn create_mapper(rom: &Rom) -> Result<Box<dyn Mapper>, RomError> {
    match rom.header.mapper_id {
        0 => Ok(Box::new(Nrom::new(rom))),
        1 => Ok(Box::new(Mmc1::new(rom))),
        2 => Ok(Box::new(Uxrom::new(rom))),
        3 => Ok(Box::new(Cnrom::new(rom))),
        4 => Ok(Box::new(Mmc3::new(rom))),
        7 => Ok(Box::new(Axrom::new(rom))),
        9 => Ok(Box::new(Mmc2::new(rom))),
        79 => Ok(Box::new(ColorDreams::new(rom))),
        id => {
            log::warn!("mapper {id} is not supported");
            Err(RomError::UnsupportedMapper(id))
        }
    }
}

/// Mapper ids this crate implements.
#[must_use]
pub fn supported_mappers() -> &'static [u16] {
    &[0, 1, 2, 3, 4, 7, 9, 79]
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::rom::{Rom, RomHeader};
    use crate::Mirroring;

    /// In-memory ROM with zeroed payloads for mapper tests.
    pub(crate) fn test_rom(prg_banks: usize, chr_banks: usize, mapper_id: u16) -> Rom {
        Rom {
            header: RomHeader {
                prg_rom_size: prg_banks * 16384,
                chr_rom_size: chr_banks * 8192,
                prg_ram_size: 8192,
                prg_nvram_size: 0,
                chr_ram_size: if chr_banks == 0 { 8192 } else { 0 },
                mapper_id,
                mirroring: Mirroring::Vertical,
                has_battery: false,
                has_trainer: false,
                nes2: false,
                timing: 0,
            },
            trainer: None,
            prg_rom: vec![0; prg_banks * 16384],
            chr_rom: vec![0; chr_banks * 8192],
        }
    }
}
