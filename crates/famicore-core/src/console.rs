//! Console: the master-cycle scheduler and the host-facing API.

use famicore_apu::AudioSink;
use famicore_cpu::Cpu;
use famicore_mappers::{create_mapper, Mapper, Rom, RomError};
use famicore_ppu::PixelSink;

use crate::bus::SystemBus;

/// NTSC timing constants.
pub mod timing {
    /// Master (PPU) dots per second.
    pub const PPU_CLOCK_HZ: u32 = 5_369_318;
    /// CPU cycles per second (one third of the dot clock).
    pub const CPU_CLOCK_HZ: u32 = 1_789_772;
    /// Nominal frame rate.
    pub const FRAME_RATE: f64 = 60.0988;
}

/// Errors surfaced while constructing a console.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// ROM image failed to parse or asked for an unsupported mapper.
    #[error(transparent)]
    Rom(#[from] RomError),
}

/// The emulated console: CPU plus everything on its bus.
///
/// Per master cycle the scheduler advances the PPU three dots, the APU one
/// cycle, and then exactly one of: a DMC DMA cycle, an OAM DMA cycle, or a
/// CPU cycle. DMA transfers keep the CPU off the bus for their full
/// duration, which is what produces the 513/514-cycle OAM and 4-cycle DMC
/// stalls.
pub struct Console {
    cpu: Cpu,
    bus: SystemBus,
    frame_count: u64,
}

impl Console {
    /// Build a console from a `.nes` image, with audio at 48 kHz.
    pub fn new(rom_data: &[u8]) -> Result<Self, ConsoleError> {
        Self::with_sample_rate(rom_data, 48_000)
    }

    /// Build a console from a `.nes` image with a specific audio rate.
    pub fn with_sample_rate(rom_data: &[u8], sample_rate: u32) -> Result<Self, ConsoleError> {
        let rom = Rom::load(rom_data)?;
        let mapper = create_mapper(&rom)?;
        log::debug!(
            "loaded ROM: mapper {} ({}), {} KiB PRG, {} KiB CHR",
            mapper.id(),
            mapper.name(),
            rom.prg_rom.len() / 1024,
            rom.chr_rom.len() / 1024,
        );
        Ok(Self::with_mapper(mapper, sample_rate))
    }

    /// Build a console around an already-constructed mapper.
    #[must_use]
    pub fn with_mapper(mapper: Box<dyn Mapper>, sample_rate: u32) -> Self {
        let bus = SystemBus::new(mapper, sample_rate);
        let mut console = Self {
            cpu: Cpu::new(),
            bus,
            frame_count: 0,
        };
        console.cpu.reset(&mut console.bus);
        console
    }

    /// Run master cycles until the PPU signals the end of the visible
    /// frame (or the CPU halts on a HLT opcode). Pixels land in `video`,
    /// the frame's audio batch in `audio`.
    pub fn clock_frame(&mut self, video: &mut impl PixelSink, audio: &mut impl AudioSink) {
        loop {
            let mut frame_complete = false;

            for _ in 0..3 {
                let signals = self.bus.tick_ppu(video);
                frame_complete |= signals.frame_complete;
                if signals.nmi {
                    self.cpu.trigger_nmi();
                }
            }

            self.bus.apu.tick();

            if self.bus.apu.dmc_dma_active() {
                self.bus.tick_dmc_dma();
            } else if self.bus.oam_dma_active() {
                self.bus.tick_oam_dma();
            } else {
                let irq = self.bus.irq_line();
                self.cpu.set_irq_line(irq);
                self.cpu.tick(&mut self.bus);
            }

            self.bus.bump_master_cycle();

            if frame_complete || self.cpu.halted() {
                break;
            }
        }

        self.bus.apu.flush_samples(audio);
        self.frame_count += 1;
    }

    /// Reset line: clears CPU and APU state and mapper banking, keeps ROM,
    /// RAM and PPU memory.
    pub fn soft_reset(&mut self) {
        log::debug!("soft reset");
        self.bus.soft_reset();
        self.cpu.reset(&mut self.bus);
    }

    /// Power cycle: everything reinitialised except the loaded ROM.
    pub fn hard_reset(&mut self) {
        log::debug!("hard reset");
        self.bus.hard_reset();
        self.cpu.reset(&mut self.bus);
        self.frame_count = 0;
    }

    /// Update a controller snapshot (bit 7 = A .. bit 0 = Right).
    pub fn set_controller(&mut self, port: usize, buttons: u8) {
        self.bus.set_controller(port, buttons);
    }

    /// The CPU halted on a HLT opcode.
    #[must_use]
    pub fn halted(&self) -> bool {
        self.cpu.halted()
    }

    /// Frames completed since power-on.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Master cycles since power-on.
    #[must_use]
    pub fn master_cycles(&self) -> u64 {
        self.bus.master_cycles()
    }

    /// CPU view, for tests and debug UIs.
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Bus view, for tests and debug UIs.
    #[must_use]
    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    /// Mutable bus access, for tests and debug tooling.
    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    /// Battery-backed save RAM, if the board has any.
    #[must_use]
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.bus.mapper.battery_ram()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famicore_apu::NullAudio;
    use famicore_cpu::Bus;
    use famicore_ppu::NullVideo;

    /// 32 KiB NROM image whose reset vector points at `program` loaded to
    /// $8000.
    fn nrom_image(program: &[u8]) -> Vec<u8> {
        let mut image = vec![0x4E, 0x45, 0x53, 0x1A, 2, 1, 0, 0];
        image.extend_from_slice(&[0; 8]);
        let mut prg = vec![0xEA; 0x8000];
        prg[..program.len()].copy_from_slice(program);
        prg[0x7FFC] = 0x00;
        prg[0x7FFD] = 0x80;
        image.extend_from_slice(&prg);
        image.extend_from_slice(&[0; 0x2000]); // CHR
        image
    }

    #[test]
    fn test_construction_rejects_bad_rom() {
        assert!(Console::new(&[0; 4]).is_err());
    }

    #[test]
    fn test_frame_advances_counters() {
        let mut console = Console::new(&nrom_image(&[])).unwrap();
        console.clock_frame(&mut NullVideo, &mut NullAudio);
        assert_eq!(console.frame_count(), 1);
        assert!(console.master_cycles() > 0);
        assert!(console.cpu().cycles() > 0);
    }

    #[test]
    fn test_soft_reset_preserves_ram() {
        let mut console = Console::new(&nrom_image(&[])).unwrap();
        console.bus_mut().write(0x0010, 0x77);
        console.soft_reset();
        assert_eq!(console.bus_mut().read(0x0010), 0x77);
    }

    #[test]
    fn test_hard_reset_clears_ram() {
        let mut console = Console::new(&nrom_image(&[])).unwrap();
        console.bus_mut().write(0x0010, 0x77);
        console.hard_reset();
        assert_eq!(console.bus_mut().read(0x0010), 0x00);
    }

    #[test]
    fn test_halt_stops_the_frame_loop() {
        // LDA #$42, STA $00, HLT
        let mut console = Console::new(&nrom_image(&[0xA9, 0x42, 0x85, 0x00, 0x02])).unwrap();
        console.clock_frame(&mut NullVideo, &mut NullAudio);
        assert!(console.halted());
        assert_eq!(console.bus_mut().read(0x0000), 0x42);
    }
}
