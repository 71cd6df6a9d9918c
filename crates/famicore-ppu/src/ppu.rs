//! PPU dot state machine, register port, and pixel composition.

use crate::background::Background;
use crate::oam::{evaluate, Oam, SecondaryOam};
use crate::palette::{resolve_rgb, PaletteRam};
use crate::registers::{PpuCtrl, PpuMask, PpuStatus};
use crate::scroll::Scroll;
use crate::sprites::SpriteShifters;
use crate::{PixelSink, PpuBus};

/// Dots per scanline.
pub const DOTS_PER_LINE: u16 = 341;
/// Scanlines per frame (261 is the pre-render line).
pub const LINES_PER_FRAME: u16 = 262;
/// First vblank scanline.
const VBLANK_LINE: u16 = 241;
/// Pre-render scanline.
const PRE_RENDER_LINE: u16 = 261;

/// Dots between the NMI condition going high and the CPU seeing the line.
const NMI_DELAY_DOTS: u8 = 3;

/// Open-bus decay horizon, roughly one second of dots.
const OPEN_BUS_DECAY_DOTS: u32 = 5_300_000;

/// Result of one PPU dot.
#[derive(Debug, Clone, Copy, Default)]
pub struct PpuSignals {
    /// The visible frame ended (vblank line reached).
    pub frame_complete: bool,
    /// The delayed NMI output fired this dot.
    pub nmi: bool,
}

/// Ricoh 2C02 PPU state.
pub struct Ppu {
    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    scroll: Scroll,
    palette: PaletteRam,
    oam: Oam,
    secondary: SecondaryOam,
    background: Background,
    sprites: SpriteShifters,

    scanline: u16,
    dot: u16,
    odd_frame: bool,

    /// PPUDATA delayed-read buffer.
    read_buffer: u8,
    /// Register-port open bus with decay.
    open_bus: u8,
    decay_counter: u32,

    /// Countdown from NMI condition to the CPU-visible edge.
    nmi_delay: u8,
    /// A $2002 read raced the vblank set point.
    suppress_vblank: bool,
}

impl Ppu {
    /// Power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            scroll: Scroll::new(),
            palette: PaletteRam::new(),
            oam: Oam::new(),
            secondary: SecondaryOam::default(),
            background: Background::new(),
            sprites: SpriteShifters::new(),
            scanline: 0,
            dot: 0,
            odd_frame: false,
            read_buffer: 0,
            open_bus: 0,
            decay_counter: 0,
            nmi_delay: 0,
            suppress_vblank: false,
        }
    }

    /// Reset registers and timing. Nametable contents live behind the bus
    /// and are untouched here.
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.scroll = Scroll::new();
        self.palette.reset();
        self.oam.reset();
        self.secondary = SecondaryOam::default();
        self.background.reset();
        self.sprites = SpriteShifters::new();
        self.scanline = 0;
        self.dot = 0;
        self.odd_frame = false;
        self.read_buffer = 0;
        self.open_bus = 0;
        self.decay_counter = 0;
        self.nmi_delay = 0;
        self.suppress_vblank = false;
    }

    /// Advance one dot.
    pub fn tick(&mut self, bus: &mut impl PpuBus, pixels: &mut impl PixelSink) -> PpuSignals {
        let mut signals = PpuSignals::default();

        if self.decay_counter > 0 {
            self.decay_counter -= 1;
            if self.decay_counter == 0 {
                self.open_bus = 0;
            }
        }

        // Delayed NMI edge: fire only if the condition still holds.
        if self.nmi_delay > 0 {
            self.nmi_delay -= 1;
            if self.nmi_delay == 0
                && self.ctrl.nmi_enabled()
                && self.status.contains(PpuStatus::VBLANK)
            {
                signals.nmi = true;
            }
        }

        let rendering = self.mask.rendering_enabled();
        let visible_line = self.scanline < 240;
        let pre_render = self.scanline == PRE_RENDER_LINE;

        if pre_render && self.dot == 1 {
            self.status.remove(
                PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT | PpuStatus::SPRITE_OVERFLOW,
            );
            self.nmi_delay = 0;
        }

        if self.scanline == VBLANK_LINE && self.dot == 1 {
            signals.frame_complete = true;
            if self.suppress_vblank {
                self.suppress_vblank = false;
            } else {
                self.status.insert(PpuStatus::VBLANK);
                if self.ctrl.nmi_enabled() {
                    self.nmi_delay = NMI_DELAY_DOTS;
                }
            }
        }

        if (visible_line || pre_render) && rendering {
            self.run_fetch_pipeline(bus, pre_render);

            if self.dot == 257 {
                self.secondary = evaluate(&self.oam, self.scanline, self.ctrl.sprite_height());
                if self.secondary.overflow {
                    self.status.insert(PpuStatus::SPRITE_OVERFLOW);
                }
            }
            if self.dot == 260 {
                bus.mapper_scanline();
            }
            if self.dot == 340 {
                self.fetch_sprites(bus);
            }
        }

        if visible_line && (1..=256).contains(&self.dot) {
            self.render_pixel(pixels);
            if rendering {
                self.sprites.tick();
            }
        }

        self.advance(rendering);
        signals
    }

    /// Background fetch pipeline, loopy increments and address reloads.
    fn run_fetch_pipeline(&mut self, bus: &mut impl PpuBus, pre_render: bool) {
        let dot = self.dot;
        let in_fetch = (2..=257).contains(&dot) || (321..=337).contains(&dot);

        if in_fetch {
            self.background.shift();
            match (dot - 1) & 0x07 {
                0 => {
                    self.background.reload();
                    let tile = bus.read(self.scroll.tile_addr());
                    self.background.set_tile(tile);
                }
                2 => {
                    let attr = bus.read(self.scroll.attribute_addr());
                    self.background
                        .set_attribute(self.scroll.attribute_quadrant(attr));
                }
                4 => {
                    let addr = self.pattern_addr();
                    let lo = bus.read(addr);
                    self.background.set_pattern_lo(lo);
                }
                6 => {
                    let addr = self.pattern_addr() + 8;
                    let hi = bus.read(addr);
                    self.background.set_pattern_hi(hi);
                }
                7 => self.scroll.increment_x(),
                _ => {}
            }
        }

        if dot == 256 {
            self.scroll.increment_y();
        }
        if dot == 257 {
            self.background.reload();
            self.scroll.copy_x();
        }
        if dot == 338 || dot == 340 {
            let tile = bus.read(self.scroll.tile_addr());
            self.background.set_tile(tile);
        }
        if pre_render && (280..=304).contains(&dot) {
            self.scroll.copy_y();
        }
    }

    fn pattern_addr(&self) -> u16 {
        self.ctrl.background_table()
            + (u16::from(self.background.tile()) << 4)
            + self.scroll.fine_y()
    }

    /// Load the eight sprite shifters from secondary OAM (dot 340).
    fn fetch_sprites(&mut self, bus: &mut impl PpuBus) {
        self.sprites.clear();
        let height = self.ctrl.sprite_height();

        // Secondary OAM is swapped out so the borrow of `self` stays clean.
        let secondary = std::mem::take(&mut self.secondary);
        for (slot, entry) in secondary.entries().iter().enumerate() {
            let mut row = self.scanline - u16::from(entry.y);
            if entry.attr & 0x80 != 0 {
                row = height - 1 - row;
            }

            let addr = if height == 16 {
                let table = u16::from(entry.tile & 0x01) << 12;
                let mut tile = u16::from(entry.tile & 0xFE);
                if row >= 8 {
                    tile += 1;
                    row -= 8;
                }
                table + (tile << 4) + row
            } else {
                self.ctrl.sprite_table() + (u16::from(entry.tile) << 4) + row
            };

            let mut lo = bus.read(addr);
            let mut hi = bus.read(addr + 8);
            if entry.attr & 0x40 != 0 {
                lo = lo.reverse_bits();
                hi = hi.reverse_bits();
            }
            self.sprites
                .load(slot, lo, hi, entry.attr, entry.x, entry.oam_index == 0);
        }
        self.secondary = secondary;
    }

    /// Compose and emit the pixel for the current dot.
    fn render_pixel(&mut self, pixels: &mut impl PixelSink) {
        let dot = self.dot;
        let x = (dot - 1) as u8;
        let y = self.scanline as u8;

        let mut bg_pixel = 0;
        let mut bg_palette = 0;
        if self.mask.contains(PpuMask::BACKGROUND)
            && (dot > 8 || self.mask.contains(PpuMask::BACKGROUND_LEFT))
        {
            let (pixel, palette) = self.background.pixel(self.scroll.fine_x());
            bg_pixel = pixel;
            bg_palette = palette;
        }

        let sprite = if self.mask.contains(PpuMask::SPRITES)
            && (dot > 8 || self.mask.contains(PpuMask::SPRITES_LEFT))
        {
            self.sprites.pixel()
        } else {
            None
        };

        let palette_addr = match (bg_pixel, sprite) {
            (0, None) => 0,
            (0, Some(sp)) => 0x10 | (sp.palette << 2) | sp.pixel,
            (_, None) => (bg_palette << 2) | bg_pixel,
            (_, Some(sp)) => {
                let min_dot = if self
                    .mask
                    .contains(PpuMask::BACKGROUND_LEFT | PpuMask::SPRITES_LEFT)
                {
                    1
                } else {
                    9
                };
                if sp.is_sprite_zero
                    && self.mask.contains(PpuMask::BACKGROUND | PpuMask::SPRITES)
                    && (min_dot..=255).contains(&dot)
                {
                    self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
                }
                if sp.behind_background {
                    (bg_palette << 2) | bg_pixel
                } else {
                    0x10 | (sp.palette << 2) | sp.pixel
                }
            }
        };

        let index = self.palette.read(u16::from(palette_addr));
        let rgb = resolve_rgb(
            index,
            self.mask.emphasis(),
            self.mask.contains(PpuMask::GREYSCALE),
        );
        pixels.set_pixel(x, y, rgb);
    }

    /// Step the dot/scanline counters, skipping pre-render dot 340 on odd
    /// frames while rendering.
    fn advance(&mut self, rendering: bool) {
        if rendering && self.odd_frame && self.scanline == PRE_RENDER_LINE && self.dot == 339 {
            self.scanline = 0;
            self.dot = 0;
            self.odd_frame = !self.odd_frame;
            return;
        }

        self.dot += 1;
        if self.dot == DOTS_PER_LINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline == LINES_PER_FRAME {
                self.scanline = 0;
                self.odd_frame = !self.odd_frame;
            }
        }
    }

    // ---- CPU register port ($2000-$2007 behind 8-byte mirroring) ----

    /// Register read.
    pub fn read_register(&mut self, addr: u16, bus: &mut impl PpuBus) -> u8 {
        match addr & 0x0007 {
            // PPUSTATUS
            2 => {
                let value = (self.status.bits() & 0xE0) | (self.open_bus & 0x1F);

                // Racing the vblank set point suppresses flag and NMI;
                // reading just after it cancels the queued NMI via the
                // cleared flag.
                if self.scanline == VBLANK_LINE && self.dot <= 1 {
                    self.suppress_vblank = true;
                    self.nmi_delay = 0;
                }
                self.status.remove(PpuStatus::VBLANK);
                self.scroll.reset_toggle();

                self.open_bus = value;
                value
            }
            // OAMDATA
            4 => {
                let value = self.oam.read();
                self.open_bus = value;
                self.refresh_open_bus();
                value
            }
            // PPUDATA
            7 => {
                let addr = self.scroll.addr() & 0x3FFF;
                let value = if addr >= 0x3F00 {
                    // Palette reads bypass the buffer; the buffer refills
                    // from the nametable underneath ($2xxx mirror).
                    self.read_buffer = bus.read(addr - 0x1000);
                    (self.palette.read(addr) & 0x3F) | (self.open_bus & 0xC0)
                } else {
                    let buffered = self.read_buffer;
                    self.read_buffer = bus.read(addr);
                    buffered
                };
                self.scroll.increment(self.ctrl.vram_increment());
                self.open_bus = value;
                self.refresh_open_bus();
                value
            }
            // Write-only ports read back the decaying bus latch.
            _ => self.open_bus,
        }
    }

    /// Register write.
    pub fn write_register(&mut self, addr: u16, value: u8, bus: &mut impl PpuBus) {
        self.open_bus = value;
        self.refresh_open_bus();

        match addr & 0x0007 {
            // PPUCTRL
            0 => {
                let was_enabled = self.ctrl.nmi_enabled();
                self.ctrl = PpuCtrl::from_bits_retain(value);
                self.scroll.write_ctrl(value);

                // Enabling NMI mid-vblank re-arms the output.
                if !was_enabled
                    && self.ctrl.nmi_enabled()
                    && self.status.contains(PpuStatus::VBLANK)
                    && self.nmi_delay == 0
                {
                    self.nmi_delay = NMI_DELAY_DOTS;
                }
            }
            // PPUMASK
            1 => self.mask = PpuMask::from_bits_retain(value),
            // PPUSTATUS is read-only
            2 => {}
            // OAMADDR
            3 => self.oam.set_addr(value),
            // OAMDATA
            4 => self.oam.write(value),
            // PPUSCROLL
            5 => self.scroll.write_scroll(value),
            // PPUADDR
            6 => self.scroll.write_addr(value),
            // PPUDATA
            7 => {
                let addr = self.scroll.addr() & 0x3FFF;
                if addr >= 0x3F00 {
                    self.palette.write(addr, value);
                } else {
                    bus.write(addr, value);
                }
                self.scroll.increment(self.ctrl.vram_increment());
            }
            _ => unreachable!(),
        }
    }

    /// OAM DMA byte (written at the current OAMADDR, which increments).
    pub fn write_oam(&mut self, value: u8) {
        self.oam.write(value);
    }

    fn refresh_open_bus(&mut self) {
        self.decay_counter = OPEN_BUS_DECAY_DOTS;
    }

    /// Current scanline (0-261).
    #[must_use]
    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    /// Current dot within the scanline (0-340).
    #[must_use]
    pub fn dot(&self) -> u16 {
        self.dot
    }

    /// Sprite-0 hit flag, for tests and debug UIs.
    #[must_use]
    pub fn sprite_zero_hit(&self) -> bool {
        self.status.contains(PpuStatus::SPRITE_ZERO_HIT)
    }

    /// Vblank flag, for tests and debug UIs.
    #[must_use]
    pub fn in_vblank(&self) -> bool {
        self.status.contains(PpuStatus::VBLANK)
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
