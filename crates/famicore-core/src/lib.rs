//! NES emulation core: the deterministic hardware engine tying the 6502
//! CPU, 2C02 PPU, 2A03 APU and cartridge mapper together on one bus.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── Console ────────────────────────┐
//! │  ┌──────────────────── SystemBus ────────────────────┐  │
//! │  │  ┌─────┐  ┌─────┐  ┌─────┐  ┌────────┐  ┌──────┐  │  │
//! │  │  │ RAM │  │ PPU │  │ APU │  │ Mapper │  │ Pads │  │  │
//! │  │  └─────┘  └─────┘  └─────┘  └────────┘  └──────┘  │  │
//! │  └───────────────────────▲───────────────────────────┘  │
//! │                      ┌───┴───┐                          │
//! │                      │  CPU  │                          │
//! │                      └───────┘                          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! One master cycle = three PPU dots + one APU cycle + one cycle of
//! whichever of DMC DMA, OAM DMA or the CPU owns the bus. The host drives
//! whole frames through [`Console::clock_frame`], providing a
//! [`PixelSink`] for video and an [`AudioSink`] for sound; hosts with no
//! working output pass [`NullVideo`]/[`NullAudio`] and the core runs
//! silent and invisible.
//!
//! # Example
//!
//! ```no_run
//! use famicore_core::{Console, Controller, NullAudio, NullVideo};
//!
//! let rom = std::fs::read("game.nes").expect("read ROM");
//! let mut console = Console::new(&rom).expect("load ROM");
//!
//! loop {
//!     console.set_controller(0, Controller::A | Controller::RIGHT);
//!     console.clock_frame(&mut NullVideo, &mut NullAudio);
//!     if console.halted() {
//!         break;
//!     }
//! }
//! ```

mod bus;
mod console;
pub mod input;

pub use bus::SystemBus;
pub use console::{timing, Console, ConsoleError};
pub use input::Controller;

// The pieces hosts need without depending on every sub-crate directly.
pub use famicore_apu::{Apu, AudioSink, NullAudio};
pub use famicore_cpu::Cpu;
pub use famicore_mappers::{create_mapper, Mapper, Mirroring, Rom, RomError};
pub use famicore_ppu::{NullVideo, PixelSink, Ppu};

/// Screen geometry.
pub mod screen {
    /// Visible width in pixels.
    pub const WIDTH: usize = famicore_ppu::FRAME_WIDTH;
    /// Visible height in pixels.
    pub const HEIGHT: usize = famicore_ppu::FRAME_HEIGHT;
    /// Pixels per frame.
    pub const PIXELS: usize = WIDTH * HEIGHT;
}
